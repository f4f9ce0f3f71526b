// src/ingest/normalize.rs
//! Text cleanup and article identity. Pure functions, no I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use md5::{Digest, Md5};
use std::fmt::Write as _;

use crate::ingest::types::RawArticle;

/// Length of an article id in hex chars.
pub const ID_LEN: usize = 12;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

// `&amp;` goes last so that `&amp;lt;` decodes to the literal `&lt;`.
const ENTITIES: [(&str, &str); 7] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&nbsp;", " "),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&quot;", "\""),
    ("&amp;", "&"),
];

/// Remove markup, decode the common named entities, collapse whitespace.
///
/// Tags are replaced by a space before decoding, so escaped markup such as
/// `&lt;b&gt;` survives as literal text.
pub fn strip_markup(text: &str) -> String {
    let mut out = RE_TAGS.replace_all(text, " ").into_owned();
    for (ent, rep) in ENTITIES {
        if out.contains(ent) {
            out = out.replace(ent, rep);
        }
    }
    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// Keep at most `max` chars (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Dedup key: first 12 hex chars of MD5 over `title ++ link`. Ids already in
/// a stored history keep matching.
pub fn identify(article: &RawArticle) -> String {
    identify_parts(&article.title, &article.link)
}

pub fn identify_parts(title: &str, link: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(title.as_bytes());
    hasher.update(link.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(ID_LEN);
    for b in digest.iter().take(ID_LEN / 2) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_entities() {
        let s = "<p>Multa&nbsp;de <b>300.000&nbsp;€</b> a &quot;Acme&quot; &amp; Cía</p>";
        assert_eq!(strip_markup(s), r#"Multa de 300.000 € a "Acme" & Cía"#);
    }

    #[test]
    fn escaped_markup_stays_literal() {
        assert_eq!(strip_markup("a &amp;lt;b&amp;gt; c"), "a &lt;b&gt; c");
        assert_eq!(strip_markup("x &lt;y&gt;"), "x <y>");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(strip_markup("  A\n\t B   C  "), "A B C");
        assert_eq!(strip_markup(""), "");
    }

    #[test]
    fn truncation_counts_chars() {
        assert_eq!(truncate_chars("sanción", 6), "sanció");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("ñññ", 0), "");
    }

    #[test]
    fn identity_is_stable_and_sensitive() {
        let a = identify_parts("Multa AEPD", "https://x/1");
        assert_eq!(a, identify_parts("Multa AEPD", "https://x/1"));
        assert_eq!(a.len(), ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, identify_parts("Multa AEPD", "https://x/2"));
        assert_ne!(a, identify_parts("Multa CNMC", "https://x/1"));
    }

    #[test]
    fn identity_matches_md5_prefix_of_title_and_link() {
        assert_eq!(
            identify_parts("Multa AEPD a empresa por brecha de datos", "https://x/1"),
            "7977f8355a33"
        );
    }
}
