//! Chat-completions client for any OpenAI-compatible endpoint.
//!
//! OpenRouter, OpenAI, Ollama, vLLM and llama.cpp all accept the same
//! `/chat/completions` body with function calling. One request per model
//! turn, never streamed.

use async_trait::async_trait;
use rustedtutor_core::error::ProviderError;
use rustedtutor_core::message::{Message, MessageToolCall};
use rustedtutor_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Seconds to back off when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

pub struct OpenAiCompatProvider {
    name: String,
    completions_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// `base_url` is the API root, e.g. `https://openrouter.ai/api/v1`.
    pub fn new(name: impl Into<String>, base_url: &str, api_key: impl Into<String>) -> Self {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(provider = %name, error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            completions_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            name,
            api_key: api_key.into(),
            client,
        }
    }
}

/// Error for a non-200 completion status.
fn status_error(status: u16, retry_after: Option<u64>, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        401 | 403 => ProviderError::AuthenticationFailed(format!("HTTP {status}: check the API key")),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key configured for provider '{}'",
                self.name
            )));
        }

        let body = ChatRequest::from(&request);
        debug!(
            provider = %self.name,
            model = %request.model,
            turns = request.messages.len(),
            tools = request.tools.len(),
            "Requesting completion"
        );

        let response = self
            .client
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let text = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %text, "Completion request failed");
            return Err(status_error(status, retry_after, text));
        }

        let reply: ChatResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("unreadable completion: {e}"),
        })?;
        let reply = reply.into_provider_response()?;
        debug!(provider = %self.name, model = %reply.model, tokens = ?reply.total_tokens, "Completion received");
        Ok(reply)
    }
}

// Wire types for /chat/completions.

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

impl<'a> From<&'a ProviderRequest> for ChatRequest<'a> {
    fn from(request: &'a ProviderRequest) -> Self {
        Self {
            model: &request.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            stream: false,
            max_tokens: request.max_tokens,
            tools: request.tools.iter().map(WireTool::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: Some(message.content.clone()),
            tool_calls: message
                .requests_tools()
                .then(|| message.tool_calls.iter().map(WireToolCall::from).collect()),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".into()
}

impl From<&MessageToolCall> for WireToolCall {
    fn from(call: &MessageToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_kind(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolDefinition,
}

impl<'a> From<&'a ToolDefinition> for WireTool<'a> {
    fn from(definition: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: definition,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

impl ChatResponse {
    /// The first choice as an assistant turn.
    fn into_provider_response(self) -> Result<ProviderResponse, ProviderError> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: "completion had no choices".into(),
            });
        };

        let content = choice.message.content.unwrap_or_default();
        let calls: Vec<MessageToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| MessageToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();
        let message = if calls.is_empty() {
            Message::assistant(content)
        } else {
            Message {
                content,
                ..Message::tool_request(calls)
            }
        };

        Ok(ProviderResponse {
            message,
            model: self.model,
            total_tokens: self.usage.map(|u| u.total_tokens),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn physics_request(tools: Vec<ToolDefinition>) -> ProviderRequest {
        ProviderRequest::new(
            "google/gemini-2.0-flash-001",
            Message::exchange("You are a physics tutor.", "What is g?"),
        )
        .tools(tools)
    }

    #[test]
    fn completions_url_joins_base() {
        let provider = OpenAiCompatProvider::new("ollama", "http://localhost:11434/v1/", "ollama");
        assert_eq!(provider.completions_url, "http://localhost:11434/v1/chat/completions");
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn request_body_for_tool_free_route() {
        let request = physics_request(vec![]).max_tokens(Some(256));
        let body = serde_json::to_value(ChatRequest::from(&request)).unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "What is g?");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn request_body_offers_granted_tools() {
        let request = physics_request(vec![ToolDefinition {
            name: "physics_constants".into(),
            description: "Look up a physical constant".into(),
            parameters: serde_json::json!({"type": "object"}),
        }]);
        let body = serde_json::to_value(ChatRequest::from(&request)).unwrap();
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "physics_constants");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn tool_turns_round_trip_to_wire() {
        let call = MessageToolCall {
            id: "call_1".into(),
            name: "calculator".into(),
            arguments: r#"{"expression":"2+2"}"#.into(),
        };
        let request = Message::tool_request(vec![call]);
        let wire = serde_json::to_value(WireMessage::from(&request)).unwrap();
        assert_eq!(wire["role"], "assistant");
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "calculator");

        let reply = serde_json::to_value(WireMessage::from(&Message::tool_result("call_1", "{}"))).unwrap();
        assert_eq!(reply["role"], "tool");
        assert_eq!(reply["tool_call_id"], "call_1");
    }

    #[test]
    fn parses_tool_call_reply() {
        let raw = r#"{
            "model": "google/gemini-2.0-flash-001",
            "choices": [{"message": {"role": "assistant", "content": null,
                "tool_calls": [{"id": "c1", "type": "function",
                    "function": {"name": "calculator", "arguments": "{\"expression\":\"6*7\"}"}}]}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let reply: ChatResponse = serde_json::from_str(raw).unwrap();
        let response = reply.into_provider_response().unwrap();
        assert!(response.message.requests_tools());
        assert_eq!(response.message.tool_calls[0].name, "calculator");
        assert_eq!(response.message.content, "");
        assert_eq!(response.total_tokens, Some(15));
    }

    #[test]
    fn empty_choices_is_an_error() {
        let reply: ChatResponse = serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        assert!(matches!(
            reply.into_provider_response(),
            Err(ProviderError::ApiError { status_code: 200, .. })
        ));
    }

    #[test]
    fn status_codes_map_to_errors() {
        assert!(matches!(
            status_error(429, None, String::new()),
            ProviderError::RateLimited { retry_after_secs: DEFAULT_RETRY_AFTER_SECS }
        ));
        assert!(matches!(
            status_error(429, Some(30), String::new()),
            ProviderError::RateLimited { retry_after_secs: 30 }
        ));
        assert!(matches!(status_error(403, None, String::new()), ProviderError::AuthenticationFailed(_)));
        assert!(matches!(
            status_error(502, None, "bad gateway".into()),
            ProviderError::ApiError { status_code: 502, .. }
        ));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let provider = OpenAiCompatProvider::new("openrouter", "http://127.0.0.1:9/v1", "");
        let err = provider.complete(physics_request(vec![])).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
