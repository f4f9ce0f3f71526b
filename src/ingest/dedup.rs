// src/ingest/dedup.rs
use std::collections::HashSet;

/// Admits an id only once across persisted history and the current run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    existing: HashSet<String>,
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            existing: existing.into_iter().map(Into::into).collect(),
            seen: HashSet::new(),
        }
    }

    /// `true` for a first sighting. The id is recorded immediately, so a later
    /// copy from another feed or query in the same run is rejected.
    pub fn admit(&mut self, id: &str) -> bool {
        if self.existing.contains(id) {
            return false;
        }
        self.seen.insert(id.to_string())
    }

    pub fn seen_this_run(&self) -> usize {
        self.seen.len()
    }
}
