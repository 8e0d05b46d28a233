//! Anthropic Claude provider implementation

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The Messages API requires an output cap on every request
const MAX_TOKENS: usize = 4096;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("https://api.anthropic.com/v1")
    }

    fn build_request(&self, request: CompletionRequest) -> AnthropicRequest {
        let model = request.model.unwrap_or_else(|| self.default_model().to_string());
        let (system, messages) = convert_messages(request.messages);

        AnthropicRequest {
            model,
            messages,
            system,
            max_tokens: MAX_TOKENS,
            tools: request.tools.map(|tools| {
                tools
                    .into_iter()
                    .map(|t| AnthropicTool {
                        name: t.name,
                        description: t.description,
                        input_schema: t.parameters,
                    })
                    .collect()
            }),
        }
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("claude-haiku-4-5-20251001")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let api_request = self.build_request(request);
        debug!(model = %api_request.model, messages = api_request.messages.len(), "anthropic request");

        let api_key = self
            .config
            .api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::AuthenticationFailed)?;

        let req = self
            .client
            .post(format!("{}/messages", self.base_url()))
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&api_request);

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let response = check_status(response).await?;

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(api_response.into_completion())
    }
}

/// Split out the system prompt and convert the rest of the conversation.
///
/// Anthropic expects every `tool_result` answering one assistant turn in a
/// single user message, so consecutive tool messages are merged.
fn convert_messages(messages: Vec<ChatMessage>) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system = None;
    let mut converted: Vec<AnthropicMessage> = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system = Some(msg.content.raw_text()),
            Role::User => converted.push(AnthropicMessage {
                role: "user".into(),
                content: AnthropicContent::Text(msg.content.raw_text()),
            }),
            Role::Assistant => {
                let text = msg.content.raw_text();
                let content = if msg.tool_calls.is_empty() {
                    AnthropicContent::Text(text)
                } else {
                    let mut blocks = Vec::new();
                    if !text.trim().is_empty() {
                        blocks.push(AnthropicContentBlock::Text { text });
                    }
                    for tc in &msg.tool_calls {
                        blocks.push(AnthropicContentBlock::ToolUse {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input: tc.arguments_json(),
                        });
                    }
                    AnthropicContent::Blocks(blocks)
                };
                converted.push(AnthropicMessage {
                    role: "assistant".into(),
                    content,
                });
            }
            Role::Tool => {
                let block = AnthropicContentBlock::ToolResult {
                    tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                    content: msg.content.raw_text(),
                };
                if let Some(AnthropicMessage {
                    role,
                    content: AnthropicContent::Blocks(blocks),
                }) = converted.last_mut()
                {
                    if role.as_str() == "user" {
                        blocks.push(block);
                        continue;
                    }
                }
                converted.push(AnthropicMessage {
                    role: "user".into(),
                    content: AnthropicContent::Blocks(vec![block]),
                });
            }
        }
    }

    (system, converted)
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicContentBlock>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<ResponseBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

impl AnthropicResponse {
    fn into_completion(self) -> CompletionResponse {
        let mut parts = Vec::new();
        let mut tool_calls = Vec::new();

        for block in self.content {
            match block {
                ResponseBlock::Text { text } => parts.push(ContentPart::Text { text }),
                ResponseBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input.to_string(),
                }),
                ResponseBlock::Other => parts.push(ContentPart::Other),
            }
        }

        let finish_reason = match self.stop_reason.as_deref() {
            Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("max_tokens") => FinishReason::Length,
            Some("tool_use") => FinishReason::ToolCalls,
            Some("refusal") => FinishReason::ContentFilter,
            _ => FinishReason::Unknown,
        };

        CompletionResponse {
            id: self.id,
            model: self.model,
            content: MessageContent::Parts(parts),
            tool_calls,
            finish_reason,
            usage: Usage {
                prompt_tokens: self.usage.input_tokens,
                completion_tokens: self.usage.output_tokens,
                total_tokens: self.usage.input_tokens + self.usage.output_tokens,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}
