//! Agent implementation - orchestrates the model <-> sandbox loop

use crate::prompt::SYSTEM_PROMPT;
use crate::tools::Toolset;
use futures_util::{Stream, StreamExt};
use std::time::Duration;
use tracing::{debug, info, warn};
use vizcraft_error::{Error, Result};
use vizcraft_llm::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, ToolDefinition, UsageTracker,
};

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model id; `None` uses the provider's default
    pub model: Option<String>,
    /// Model turns before giving up
    pub max_turns: usize,
    /// Retries for a temporary provider failure
    pub max_retries: usize,
    /// Base delay between retries, multiplied by the attempt number
    pub retry_delay: Duration,
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_turns: 25,
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Drives a tool-calling conversation against one provider.
pub struct Agent<P> {
    provider: P,
    config: AgentConfig,
}

impl<P: LlmProvider> Agent<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, AgentConfig::default())
    }

    pub fn with_config(provider: P, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run the conversation for `prompt`, yielding a snapshot after every new
    /// message.
    ///
    /// The first snapshot holds only the user message. The stream ends after
    /// the first assistant message without tool calls, or with an error that
    /// is the last item.
    pub fn stream<'a, T: Toolset>(
        &'a self,
        tools: &'a T,
        prompt: impl Into<String>,
    ) -> impl Stream<Item = Result<Vec<ChatMessage>>> + 'a {
        let prompt = prompt.into();

        async_stream::stream! {
            let definitions = tools.definitions();
            let mut usage = UsageTracker::new();
            let mut history = vec![ChatMessage::user(prompt)];
            yield Ok(history.clone());

            for turn in 1..=self.config.max_turns {
                info!(turn, provider = self.provider.name(), "asking model");

                let response = match self.complete(&history, &definitions).await {
                    Ok(response) => response,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };
                usage.track(&response.model, &response.usage);

                let message = response.into_message();
                let calls = message.tool_calls.clone();
                history.push(message);
                yield Ok(history.clone());

                if calls.is_empty() {
                    info!(
                        turns = turn,
                        calls = usage.total_calls,
                        tokens = usage.total_tokens(),
                        "model finished"
                    );
                    return;
                }

                // One at a time, in the order the model asked for them.
                for call in &calls {
                    debug!(tool = %call.name, id = %call.id, "tool call");
                    let result = match tools.invoke(call).await {
                        Some(result) => result,
                        None => unknown_tool(&call.name, &definitions),
                    };
                    history.push(ChatMessage::tool_result(&call.id, &call.name, result));
                    yield Ok(history.clone());
                }
            }

            warn!(max_turns = self.config.max_turns, tokens = usage.total_tokens(), "turn limit reached");
            yield Err(Error::turn_limit_exceeded(self.config.max_turns)
                .with_operation("agent::stream"));
        }
    }

    /// Drain [`stream`](Self::stream) and return the final conversation.
    pub async fn run<T: Toolset>(&self, tools: &T, prompt: impl Into<String>) -> Result<Vec<ChatMessage>> {
        let stream = self.stream(tools, prompt);
        futures_util::pin_mut!(stream);

        let mut last = Vec::new();
        while let Some(snapshot) = stream.next().await {
            last = snapshot?;
        }
        Ok(last)
    }

    /// One model turn, retrying temporary failures with a linear backoff.
    async fn complete(
        &self,
        history: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<CompletionResponse> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.config.system_prompt.as_str()));
        messages.extend_from_slice(history);

        let mut request = CompletionRequest::new(messages).with_tools(tools.to_vec());
        if let Some(model) = &self.config.model {
            request = request.with_model(model.as_str());
        }

        let mut attempt = 0;
        loop {
            let err = match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => e.into_error(self.provider.name()),
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= self.config.max_retries {
                return Err(err.persist().with_context("attempts", (attempt + 1).to_string()));
            }

            attempt += 1;
            let delay = retry_delay(&err, self.config.retry_delay, attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "{}", err);
            tokio::time::sleep(delay).await;
        }
    }
}

/// A server-provided `retry_after` wins over the linear backoff.
fn retry_delay(err: &Error, base: Duration, attempt: usize) -> Duration {
    err.context_value("retry_after")
        .and_then(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(base * attempt as u32)
}

fn unknown_tool(name: &str, definitions: &[ToolDefinition]) -> String {
    warn!(tool = %name, "model called an unknown tool");
    let names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
    format!(
        "Error: {} is not a valid tool, try one of [{}].",
        name,
        names.join(", ")
    )
}
