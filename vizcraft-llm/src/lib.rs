//! # vizcraft LLM
//!
//! Chat clients for hosted language models that support tool calling.
//!
//! - **Messages**: `ChatMessage` carries text or typed content parts plus tool calls
//! - **Tools**: `ToolDefinition` describes a callable tool with a JSON schema
//! - **Provider**: `LlmProvider` trait with OpenAI and Anthropic implementations

pub mod provider;

pub use provider::{
    AnthropicProvider, ChatMessage, CompletionRequest, CompletionResponse, ContentPart,
    FinishReason, LlmProvider, MessageContent, OpenAIProvider, Provider, ProviderConfig,
    ProviderError, ProviderType, Role, ToolCall, ToolDefinition, Usage, UsageTracker,
};
