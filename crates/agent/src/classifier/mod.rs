//! Subject classifiers.
//!
//! - [`KeywordClassifier`]: deterministic vocabulary matching
//! - [`LlmClassifier`]: asks a language model, falls back to another classifier

pub mod keyword;
pub mod llm;

pub use keyword::KeywordClassifier;
pub use llm::LlmClassifier;
