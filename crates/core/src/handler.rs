//! Handler trait and the routing records that surround it.
//!
//! A handler is the language-generation collaborator behind a route: it gets
//! the delegated query plus the tools granted to its route, may call those
//! tools, and must produce user-facing text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::subject::{Query, Route, Specialist, SubjectLabel};
use crate::tool::{ToolInvocation, ToolRegistry};

/// A routing decision: which handler a classified query goes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegation {
    pub query: Query,
    pub label: SubjectLabel,
    pub route: Route,
}

impl Delegation {
    pub fn new(query: Query, label: SubjectLabel) -> Self {
        Self {
            query,
            label,
            route: Route::from(label),
        }
    }
}

/// The states a query passes through on its way to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    Classifying,
    Dispatched(SubjectLabel),
    HandlerInvoked(Specialist),
    FallbackInvoked,
    ResponseProduced,
}

/// What a handler is given.
pub struct HandlerRequest<'a> {
    pub query: &'a Query,
    pub route: Route,
    /// Only the tools granted to `route`.
    pub tools: &'a ToolRegistry,
}

/// What a handler hands back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerResponse {
    pub text: String,
    pub invocations: Vec<ToolInvocation>,
}

impl HandlerResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            invocations: Vec::new(),
        }
    }
}

/// The final outcome of handling one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorResponse {
    pub delegation: Delegation,
    pub text: String,
    pub invocations: Vec<ToolInvocation>,
    pub trail: Vec<RouteState>,
}

/// The language-generation capability behind a route.
#[async_trait]
pub trait Handler: Send + Sync {
    /// A short name for logs (e.g. "reference", "llm").
    fn name(&self) -> &str;

    async fn respond(&self, request: HandlerRequest<'_>) -> Result<HandlerResponse>;
}
