//! Human-readable rendering of the conversation as it grows

use std::io::{self, Write};
use vizcraft_llm::{ChatMessage, Role, ToolCall};

const HEADER: &str = "--- Streaming steps ---";

/// Tool results longer than this many characters are cut
const MAX_RESULT_CHARS: usize = 300;

/// First lines of `run_command` longer than this are ellipsized
const MAX_COMMAND_CHARS: usize = 60;

/// Prints each message of a snapshot stream once, flushing after every entry.
pub struct TranscriptPrinter<W> {
    out: W,
    seen: usize,
}

impl<W: Write> TranscriptPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out, seen: 0 }
    }

    pub fn header(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}\n", HEADER)?;
        self.out.flush()
    }

    /// Render the messages of `snapshot` not printed yet.
    ///
    /// User and system messages print nothing but still count as seen.
    pub fn render(&mut self, snapshot: &[ChatMessage]) -> io::Result<()> {
        let start = self.seen.min(snapshot.len());
        for message in &snapshot[start..] {
            match message.role {
                Role::Assistant => self.assistant(message)?,
                Role::Tool => self.entry(&format!(
                    "  ✓ [{}]{}",
                    message.name.as_deref().unwrap_or("?"),
                    format_tool_result(&message.content.text())
                ))?,
                Role::User | Role::System => {}
            }
            self.seen += 1;
        }
        Ok(())
    }

    /// Number of messages consumed so far
    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn assistant(&mut self, message: &ChatMessage) -> io::Result<()> {
        let text = message.content.text();
        if !text.is_empty() {
            self.entry(&format!("🤖 {}", text))?;
        }
        for call in &message.tool_calls {
            self.entry(&format!("  ⚡ {}", format_tool_call(call)))?;
        }
        Ok(())
    }

    fn entry(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}\n", line)?;
        self.out.flush()
    }
}

/// One-line summary of a tool call. File contents and scripts are not echoed.
pub fn format_tool_call(call: &ToolCall) -> String {
    let args = call.arguments_json();
    let arg = |key: &str, default: &str| -> String {
        args.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    };

    match call.name.as_str() {
        "write_file" => format!(
            "write_file path={} ({} chars)",
            quoted(&arg("path", "?")),
            arg("content", "").chars().count()
        ),
        "run_command" => {
            let command = arg("command", "");
            let first_line = command.split('\n').next().unwrap_or_default();
            let shown = if first_line.chars().count() > MAX_COMMAND_CHARS {
                let cut: String = first_line.chars().take(MAX_COMMAND_CHARS - 3).collect();
                format!("{}...", cut)
            } else {
                first_line.to_string()
            };
            let suffix = if command.contains('\n') { " (multi-line)" } else { "" };
            format!("run_command {}{}", quoted(&shown), suffix)
        }
        "read_file" => format!("read_file path={}", quoted(&arg("path", "?"))),
        "list_files" => format!("list_files path={}", quoted(&arg("path", "."))),
        "fetch_video" => format!("fetch_video path={}", quoted(&arg("container_path", "?"))),
        name => format!("{}({})", name, args),
    }
}

/// Quote `s` the way Python's `repr` does: single quotes unless the text
/// holds a single quote and no double quote.
fn quoted(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Trim, cut to [`MAX_RESULT_CHARS`], and indent multi-line results.
///
/// The returned string starts with a space or, for multi-line results, a
/// newline, so it can follow the `[name]` tag directly.
pub fn format_tool_result(content: &str) -> String {
    let content = content.trim();
    let content = if content.chars().count() > MAX_RESULT_CHARS {
        let cut: String = content.chars().take(MAX_RESULT_CHARS).collect();
        format!("{}\n... (truncated)", cut)
    } else {
        content.to_string()
    };

    if content.contains('\n') {
        let indented: Vec<String> = content.lines().map(|line| format!("  {}", line)).collect();
        format!("\n{}", indented.join("\n"))
    } else {
        format!(" {}", content)
    }
}
