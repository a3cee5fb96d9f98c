//! The tutor pipeline: classification, delegation and specialist handlers.
//!
//! Every query follows the same path:
//!
//! 1. **Classify** the query into exactly one subject label
//! 2. **Dispatch** the label to a specialist handler or the fallback path
//! 3. **Scope tools**: the handler only sees the tools granted to its route
//! 4. **Respond**: the handler calls tools and produces the final text
//!
//! Both the classifier and the handlers come in two flavours: deterministic
//! reference implementations that never touch the network, and adapters that
//! delegate to a language model through `rustedtutor_core::Provider`.

pub mod builder;
pub mod classifier;
pub mod dispatcher;
pub mod handlers;
pub mod prompts;
pub mod tutor;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use builder::TutorBuilder;
pub use classifier::{KeywordClassifier, LlmClassifier};
pub use dispatcher::Dispatcher;
pub use handlers::{LlmHandler, ReferenceHandler};
pub use tutor::Tutor;
