//! Language-model handler: the tool-calling loop.
//!
//! 1. Send the route's system prompt, the query and the route's tool definitions
//! 2. If the model calls tools, execute them against the scoped registry and
//!    feed each result back as a tool message
//! 3. Repeat until the model answers with text only, or the iteration
//!    limit is reached

use async_trait::async_trait;
use rustedtutor_core::error::Result;
use rustedtutor_core::handler::{Handler, HandlerRequest, HandlerResponse};
use rustedtutor_core::message::Message;
use rustedtutor_core::provider::{Provider, ProviderRequest};
use rustedtutor_core::tool::{ToolCall, ToolInvocation, ToolResult};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::prompts::{MAX_ITERATIONS_MESSAGE, system_prompt};

pub struct LlmHandler {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    /// Model round-trips allowed per query.
    max_iterations: usize,
}

impl LlmHandler {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            max_iterations: 5,
        }
    }

    /// Set the maximum number of model round-trips.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Set the max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

#[async_trait]
impl Handler for LlmHandler {
    fn name(&self) -> &str {
        "llm"
    }

    async fn respond(&self, request: HandlerRequest<'_>) -> Result<HandlerResponse> {
        let mut messages = Message::exchange(&system_prompt(request.route), request.query.text());
        let tool_definitions = request.tools.definitions();
        let mut invocations: Vec<ToolInvocation> = Vec::new();

        for iteration in 1..=self.max_iterations {
            debug!(route = %request.route, iteration, "LLM handler iteration");

            let response = self
                .provider
                .complete(
                    ProviderRequest::new(&self.model, messages.clone())
                        .temperature(self.temperature)
                        .max_tokens(self.max_tokens)
                        .tools(tool_definitions.clone()),
                )
                .await?;

            if !response.message.requests_tools() {
                return Ok(HandlerResponse {
                    text: response.message.content,
                    invocations,
                });
            }

            let tool_calls = response.message.tool_calls.clone();
            messages.push(response.message);

            for tc in tool_calls {
                let invocation = match tc.parse_arguments() {
                    Ok(arguments) => {
                        request
                            .tools
                            .invoke(ToolCall {
                                id: tc.id.clone(),
                                name: tc.name.clone(),
                                arguments,
                            })
                            .await
                    }
                    Err(e) => {
                        warn!(tool = %tc.name, error = %e, "Model sent malformed tool arguments");
                        ToolInvocation {
                            call: ToolCall {
                                id: tc.id.clone(),
                                name: tc.name.clone(),
                                arguments: serde_json::Value::String(tc.arguments.clone()),
                            },
                            result: ToolResult::failure(format!("Invalid tool arguments: {e}"))
                                .for_call(&tc.id),
                            duration_ms: 0,
                        }
                    }
                };

                messages.push(Message::tool_result(
                    &tc.id,
                    invocation.result.payload().to_string(),
                ));
                invocations.push(invocation);
            }
        }

        warn!(
            route = %request.route,
            iterations = self.max_iterations,
            "Max tool iterations reached"
        );
        Ok(HandlerResponse {
            text: MAX_ITERATIONS_MESSAGE.into(),
            invocations,
        })
    }
}
