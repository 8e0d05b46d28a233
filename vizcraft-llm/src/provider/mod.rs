//! # LLM Provider Interface
//!
//! A trait-based abstraction for communicating with LLM backends.
//!
//! ## Design
//! - `LlmProvider` trait defines the core interface
//! - Implementations for OpenAI and Anthropic
//! - Tool/function calling support
//! - Usage tracking

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use vizcraft_error::{Error, ErrorKind};

// ============================================================================
// Core Types
// ============================================================================

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced a tool message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn with_role(role: Role, content: MessageContent) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, MessageContent::Text(content.into()))
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, MessageContent::Text(content.into()))
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    pub fn assistant_with_tools(content: impl Into<MessageContent>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::assistant(content)
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::with_role(Role::Tool, MessageContent::Text(content.into()))
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message content: either a plain string or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Displayable text: [`raw_text`](Self::raw_text), trimmed.
    pub fn text(&self) -> String {
        self.raw_text().trim().to_string()
    }

    /// Text exactly as carried, for sending back to a provider. For parts,
    /// only `text` parts are kept, joined by newlines.
    pub fn raw_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(parts: Vec<ContentPart>) -> Self {
        MessageContent::Parts(parts)
    }
}

/// A typed content segment. Anything that is not text is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// A tool/function that the model can call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A tool call requested by the model. `arguments` is a JSON object as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.to_string(),
        }
    }

    /// Parse arguments as JSON
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.arguments_or_empty())
    }

    /// Arguments as a JSON value; empty or malformed arguments become `{}`.
    pub fn arguments_json(&self) -> serde_json::Value {
        serde_json::from_str(self.arguments_or_empty())
            .unwrap_or_else(|_| serde_json::json!({}))
    }

    fn arguments_or_empty(&self) -> &str {
        if self.arguments.trim().is_empty() {
            "{}"
        } else {
            &self.arguments
        }
    }
}

/// Request parameters for a completion
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub tools: Option<Vec<ToolDefinition>>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub content: MessageContent,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl CompletionResponse {
    /// The assistant message to append to the conversation
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::assistant_with_tools(self.content, self.tool_calls)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Unknown,
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Error type for provider operations
#[derive(Debug)]
pub enum ProviderError {
    /// Network/connection error
    Network(String),
    /// API returned an error
    Api { status: u16, message: String },
    /// Failed to parse response
    Parse(String),
    /// Rate limited
    RateLimited { retry_after: Option<u64> },
    /// Invalid request
    InvalidRequest(String),
    /// Authentication failed
    AuthenticationFailed,
    /// Other error
    Other(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "Network error: {}", e),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::RateLimited { retry_after } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after {
                    write!(f, " (retry after {}s)", secs)?;
                }
                Ok(())
            }
            Self::InvalidRequest(e) => write!(f, "Invalid request: {}", e),
            Self::AuthenticationFailed => write!(f, "Authentication failed"),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Convert into the unified error, keeping the provider name as context.
    ///
    /// Server-side failures (5xx) are temporary; other API errors are not.
    pub fn into_error(self, provider: &str) -> Error {
        let err = match &self {
            Self::Network(_) => Error::new(ErrorKind::NetworkFailed, self.to_string()),
            Self::Api { status, .. } if *status >= 500 => {
                Error::inference_failed(self.to_string()).temporary()
            }
            Self::Api { .. } | Self::InvalidRequest(_) => {
                Error::inference_failed(self.to_string()).permanent()
            }
            Self::Parse(_) => Error::parse_failed(self.to_string()),
            Self::RateLimited { retry_after } => {
                let err = Error::new(ErrorKind::RateLimited, self.to_string());
                match retry_after {
                    Some(secs) => err.with_context("retry_after", secs.to_string()),
                    None => err,
                }
            }
            Self::AuthenticationFailed => {
                Error::new(ErrorKind::AuthenticationFailed, self.to_string())
            }
            Self::Other(_) => Error::unexpected(self.to_string()),
        };
        err.with_operation("provider::complete")
            .with_context("provider", provider)
    }
}

/// The main LLM provider trait
#[allow(async_fn_in_trait)]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Send a completion request and get a full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}

/// Shared HTTP status handling for both providers
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let text = response.text().await.unwrap_or_default();

    match status.as_u16() {
        429 => Err(ProviderError::RateLimited { retry_after }),
        401 | 403 => Err(ProviderError::AuthenticationFailed),
        400 => Err(ProviderError::InvalidRequest(text)),
        code => Err(ProviderError::Api { status: code, message: text }),
    }
}

fn http_client(config: &ProviderConfig) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs.unwrap_or(120)))
        .build()
        .map_err(|e| ProviderError::Other(format!("failed to create HTTP client: {}", e)))
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for creating providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Anthropic,
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            other => Err(Error::config_invalid(
                "provider",
                format!("unknown provider '{}', expected 'openai' or 'anthropic'", other),
            )),
        }
    }
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.openai.com/v1".into()),
            default_model: Some("gpt-5.2-codex".into()),
            timeout_secs: Some(300),
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Anthropic,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.anthropic.com/v1".into()),
            default_model: Some("claude-haiku-4-5-20251001".into()),
            timeout_secs: Some(300),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// The provider selected at startup
pub enum Provider {
    OpenAI(OpenAIProvider),
    Anthropic(AnthropicProvider),
}

impl Provider {
    pub fn from_config(config: ProviderConfig) -> Result<Self, ProviderError> {
        Ok(match config.provider_type {
            ProviderType::OpenAI => Provider::OpenAI(OpenAIProvider::new(config)?),
            ProviderType::Anthropic => Provider::Anthropic(AnthropicProvider::new(config)?),
        })
    }
}

impl LlmProvider for Provider {
    fn name(&self) -> &str {
        match self {
            Provider::OpenAI(p) => p.name(),
            Provider::Anthropic(p) => p.name(),
        }
    }

    fn default_model(&self) -> &str {
        match self {
            Provider::OpenAI(p) => p.default_model(),
            Provider::Anthropic(p) => p.default_model(),
        }
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        match self {
            Provider::OpenAI(p) => p.complete(request).await,
            Provider::Anthropic(p) => p.complete(request).await,
        }
    }
}

// ============================================================================
// Usage Tracking
// ============================================================================

/// Tracks token usage across multiple calls
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    pub total_calls: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    pub by_model: HashMap<String, Usage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, model: &str, usage: &Usage) {
        self.total_calls += 1;
        self.total_prompt_tokens += usage.prompt_tokens;
        self.total_completion_tokens += usage.completion_tokens;

        let entry = self.by_model.entry(model.to_string()).or_default();
        entry.prompt_tokens += usage.prompt_tokens;
        entry.completion_tokens += usage.completion_tokens;
        entry.total_tokens += usage.total_tokens;
    }

    pub fn total_tokens(&self) -> usize {
        self.total_prompt_tokens + self.total_completion_tokens
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let sys = ChatMessage::system("You are a Manim agent");
        assert_eq!(sys.role, Role::System);
        assert_eq!(sys.content.text(), "You are a Manim agent");

        let tool = ChatMessage::tool_result("call_1", "read_file", "print('hi')");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool.name.as_deref(), Some("read_file"));
    }

    #[test]
    fn test_content_parts_keep_only_text() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text { text: "  Rendering now.".into() },
            ContentPart::Other,
            ContentPart::Text { text: "Done.  ".into() },
        ]);
        assert_eq!(content.text(), "Rendering now.\nDone.");
        assert_eq!(content.raw_text(), "  Rendering now.\nDone.  ");

        let empty = MessageContent::Parts(vec![ContentPart::Other]);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_content_parts_deserialize_unknown_types() {
        let content: MessageContent = serde_json::from_value(serde_json::json!([
            {"type": "thinking", "thinking": "hmm"},
            {"type": "text", "text": "Hello"}
        ]))
        .unwrap();
        assert_eq!(content.text(), "Hello");

        let plain: MessageContent = serde_json::from_value(serde_json::json!("plain")).unwrap();
        assert_eq!(plain, MessageContent::Text("plain".into()));
    }

    #[test]
    fn test_tool_call_arguments() {
        let call = ToolCall::new("c1", "write_file", serde_json::json!({"path": "scene.py"}));
        assert_eq!(call.arguments_json()["path"], "scene.py");

        let empty = ToolCall { id: "c2".into(), name: "list_files".into(), arguments: String::new() };
        assert_eq!(empty.arguments_json(), serde_json::json!({}));

        let broken = ToolCall { id: "c3".into(), name: "x".into(), arguments: "{oops".into() };
        assert!(broken.parse_arguments::<serde_json::Value>().is_err());
        assert_eq!(broken.arguments_json(), serde_json::json!({}));
    }

    #[test]
    fn test_provider_type_from_str() {
        assert_eq!("OpenAI".parse::<ProviderType>().unwrap(), ProviderType::OpenAI);
        assert_eq!(" anthropic ".parse::<ProviderType>().unwrap(), ProviderType::Anthropic);

        let err = "bridge".parse::<ProviderType>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_provider_config() {
        let config = ProviderConfig::openai("sk-test");
        assert_eq!(config.provider_type, ProviderType::OpenAI);
        assert_eq!(config.default_model.as_deref(), Some("gpt-5.2-codex"));
        assert_eq!(config.timeout_secs, Some(300));
        assert_eq!(config.with_timeout(30).timeout_secs, Some(30));

        let config = ProviderConfig::anthropic("sk-ant-test").with_model("claude-sonnet-4-5");
        assert_eq!(config.provider_type, ProviderType::Anthropic);
        assert_eq!(config.base_url.as_deref(), Some("https://api.anthropic.com/v1"));
        assert_eq!(config.default_model.as_deref(), Some("claude-sonnet-4-5"));
    }

    #[test]
    fn test_provider_error_mapping() {
        let err = ProviderError::RateLimited { retry_after: Some(7) }.into_error("openai");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.is_retryable());
        assert_eq!(err.context_value("retry_after"), Some("7"));
        assert_eq!(err.context_value("provider"), Some("openai"));

        let err = ProviderError::Api { status: 503, message: "overloaded".into() }.into_error("anthropic");
        assert!(err.is_retryable());

        let err = ProviderError::Api { status: 404, message: "no model".into() }.into_error("anthropic");
        assert!(!err.is_retryable());

        let err = ProviderError::AuthenticationFailed.into_error("openai");
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_usage_tracker() {
        let mut tracker = UsageTracker::new();

        tracker.track("gpt-5.2-codex", &Usage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        });

        tracker.track("gpt-5.2-codex", &Usage {
            prompt_tokens: 200,
            completion_tokens: 100,
            total_tokens: 300,
        });

        assert_eq!(tracker.total_calls, 2);
        assert_eq!(tracker.total_prompt_tokens, 300);
        assert_eq!(tracker.total_completion_tokens, 150);
        assert_eq!(tracker.total_tokens(), 450);
        assert_eq!(tracker.by_model["gpt-5.2-codex"].total_tokens, 450);
    }
}
