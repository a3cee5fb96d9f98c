//! Error types for the RustedTutor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. Tool-specific input
//! errors (calculator, equation solver, constant lookup) live next to their
//! tools and never cross the tool boundary as `Err`: tools fail closed and
//! report them inside a failed [`ToolResult`](crate::tool::ToolResult).

use thiserror::Error;

use crate::subject::Specialist;

/// The top-level error type for all RustedTutor operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Routing errors ---
    #[error("Routing error: {0}")]
    Route(#[from] RouteError),

    // --- Input errors ---
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl Error {
    /// Whether this error means the router itself is misconfigured.
    ///
    /// These are fatal: a query can never be answered until the
    /// configuration is fixed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Route(_))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Routing failures. Distinct from the normal `OTHER` path: a query outside
/// every specialist's scope is not an error, a missing specialist is.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("No handler configured for the {0} specialist")]
    HandlerNotConfigured(Specialist),
}
