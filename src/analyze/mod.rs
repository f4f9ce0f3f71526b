// src/analyze/mod.rs
//! Relevance classification of new articles by an external LLM.

pub mod classifier;
pub mod prompt;

pub use classifier::{parse_analysis, AnalysisResult, Classifier, Level, MistralClassifier};
