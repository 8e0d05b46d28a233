//! # vizcraft agent
//!
//! The loop between the model and the sandbox:
//! 1. The user asks for a video
//! 2. The model answers, possibly with tool calls
//! 3. Each tool call runs in the sandbox and its text result is appended
//! 4. Repeat until the model answers without tool calls
//!
//! Every step is published as a snapshot of the whole conversation, which
//! [`TranscriptPrinter`] renders incrementally.

mod agent;
mod prompt;
mod tools;
mod transcript;

pub use agent::{Agent, AgentConfig};
pub use prompt::{DEFAULT_PROMPT, SYSTEM_PROMPT};
pub use tools::{video_tool_definitions, Toolset, TOOL_NAMES};
pub use transcript::{format_tool_call, format_tool_result, TranscriptPrinter};
