//! # RustedTutor Core
//!
//! Domain types, traits, and errors for the RustedTutor subject router.
//! Every other crate implements against these:
//! - [`Classifier`]: maps a [`Query`] to exactly one [`SubjectLabel`]
//! - [`Handler`]: turns a delegated query (plus its granted tools) into text
//! - [`Tool`]: deterministic computation exposed to handlers
//! - [`Provider`]: the language-model backend used by the LLM adapters

pub mod classifier;
pub mod error;
pub mod event;
pub mod handler;
pub mod message;
pub mod provider;
pub mod subject;
pub mod tool;

pub use classifier::Classifier;
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus, EventRecord};
pub use handler::{Delegation, Handler, HandlerRequest, HandlerResponse, RouteState, TutorResponse};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use subject::{Query, Route, Specialist, SubjectLabel};
pub use tool::{Tool, ToolCall, ToolInvocation, ToolRegistry, ToolResult};
