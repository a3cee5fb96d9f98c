//! The language-model seam.
//!
//! The LLM classifier and the LLM handler talk to a model only through
//! [`Provider::complete`]. A request carries the transcript so far and the
//! tools granted to the route; a response is one assistant turn.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ProviderError;
use crate::message::Message;

/// Sampling temperature for tutoring answers unless configured otherwise.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Empty for routes without tools; the model then cannot call any.
    pub tools: Vec<ToolDefinition>,
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            tools: Vec::new(),
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// What the model is told about one granted tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub message: Message,
    /// The model that answered, as reported by the backend.
    pub model: String,
    pub total_tokens: Option<u32>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend name, e.g. "openrouter" or "ollama".
    fn name(&self) -> &str;

    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;
}
