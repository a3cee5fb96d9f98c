//! Handler implementations.

pub mod llm;
pub mod reference;

pub use llm::LlmHandler;
pub use reference::ReferenceHandler;
