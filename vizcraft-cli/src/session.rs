//! One video session: the agent stream printed as it arrives

use futures_util::{FutureExt, StreamExt};
use std::any::Any;
use std::future::Future;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use tracing::warn;
use vizcraft_agent::{Agent, Toolset, TranscriptPrinter};
use vizcraft_error::{Error, Result};
use vizcraft_llm::LlmProvider;

/// Drive the agent for `prompt`, rendering every snapshot to `out`.
pub async fn run_session<P, T, W>(agent: &Agent<P>, tools: &T, prompt: &str, out: W) -> Result<()>
where
    P: LlmProvider,
    T: Toolset,
    W: Write,
{
    let mut printer = TranscriptPrinter::new(out);
    printer.header()?;

    let stream = agent.stream(tools, prompt);
    futures_util::pin_mut!(stream);

    while let Some(snapshot) = stream.next().await {
        printer.render(&snapshot?)?;
    }
    Ok(())
}

/// Await `session`, turning a panic or ctrl-c into an error so the caller
/// always gets control back for teardown.
pub async fn supervise<F>(session: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    supervise_until(session, tokio::signal::ctrl_c()).await
}

/// Only a delivered interrupt ends the session early. If the signal handler
/// cannot be installed, the session runs to completion.
async fn supervise_until<F, I>(session: F, interrupt: I) -> Result<()>
where
    F: Future<Output = Result<()>>,
    I: Future<Output = std::io::Result<()>>,
{
    let guarded = AssertUnwindSafe(session).catch_unwind();
    let interrupt = async move {
        if let Err(e) = interrupt.await {
            warn!("ctrl-c handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        outcome = guarded => match outcome {
            Ok(result) => result,
            Err(panic) => Err(Error::unexpected(format!(
                "session panicked: {}",
                panic_message(panic.as_ref())
            ))
            .with_operation("session::supervise")),
        },
        _ = interrupt => {
            warn!("interrupted, cleaning up");
            Err(Error::unexpected("interrupted by ctrl-c").with_operation("session::supervise"))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use vizcraft_agent::{AgentConfig, DEFAULT_PROMPT};
    use vizcraft_error::ErrorKind;
    use vizcraft_llm::{
        CompletionRequest, CompletionResponse, FinishReason, MessageContent, ProviderError,
        ToolCall, Usage,
    };
    use vizcraft_sandbox::{ExecOutput, Sandbox, SandboxTools, EXPORT_DIR, SANDBOX_ROOT};

    struct ScriptedProvider {
        responses: Mutex<VecDeque<CompletionResponse>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(turns: Vec<(&str, Vec<ToolCall>)>) -> Self {
            let responses = turns
                .into_iter()
                .map(|(text, tool_calls)| CompletionResponse {
                    id: "resp".into(),
                    model: "scripted-1".into(),
                    content: MessageContent::Text(text.into()),
                    tool_calls,
                    finish_reason: FinishReason::Stop,
                    usage: Usage::default(),
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-1"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            if let Some(user) = request.messages.get(1) {
                self.prompts.lock().unwrap().push(user.content.text());
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::Other("script exhausted".into()))
        }
    }

    /// Runs commands on the host with the sandbox mounts mapped to temp dirs.
    struct HostSandbox {
        workspace: TempDir,
        output: TempDir,
    }

    impl HostSandbox {
        fn new() -> Self {
            Self {
                workspace: TempDir::new().unwrap(),
                output: TempDir::new().unwrap(),
            }
        }

        fn map(&self, arg: &str) -> String {
            arg.replace(SANDBOX_ROOT, &self.workspace.path().display().to_string())
                .replace(EXPORT_DIR, &self.output.path().display().to_string())
        }
    }

    impl Sandbox for HostSandbox {
        async fn exec(&self, command: &[String]) -> Result<ExecOutput> {
            let args: Vec<String> = command.iter().map(|a| self.map(a)).collect();
            let out = tokio::process::Command::new(&args[0])
                .args(&args[1..])
                .current_dir(self.workspace.path())
                .output()
                .await?;
            let mut output = out.stdout;
            output.extend_from_slice(&out.stderr);
            Ok(ExecOutput::new(out.status.code().unwrap_or(-1).into(), output))
        }
    }

    fn rendered(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_transcript() {
        let sandbox = HostSandbox::new();
        let tools = SandboxTools::new(&sandbox, sandbox.output.path());
        let video = "media/videos/scene/720p30/Pythagoras.mp4";
        let host_path = sandbox.output.path().join("Pythagoras.mp4");
        let answer = format!("The video is ready:\n{}", host_path.display());

        let provider = ScriptedProvider::new(vec![
            (
                "I'll write the scene first.",
                vec![ToolCall::new(
                    "c1",
                    "write_file",
                    json!({ "path": "scene.py", "content": "class Pythagoras(Scene): pass" }),
                )],
            ),
            (
                "",
                vec![ToolCall::new(
                    "c2",
                    "run_command",
                    json!({ "command": format!("mkdir -p $(dirname {0}) && echo frames > {0}", video) }),
                )],
            ),
            ("", vec![ToolCall::new("c3", "fetch_video", json!({ "container_path": video }))]),
            (answer.as_str(), vec![]),
        ]);
        let agent = Agent::with_config(provider, AgentConfig::default());

        let mut out = Vec::new();
        run_session(&agent, &tools, DEFAULT_PROMPT, &mut out).await.unwrap();
        let transcript = rendered(out);

        assert!(host_path.is_file());

        assert!(transcript.starts_with("--- Streaming steps ---\n\n🤖 I'll write the scene first.\n\n"));
        assert!(transcript.contains("  ⚡ write_file path='scene.py' (29 chars)\n\n"));
        assert!(transcript.contains("  ✓ [write_file] Wrote scene.py\n\n"));
        assert!(transcript.contains("  ✓ [run_command] Exit code: 0\n\n"));
        assert!(transcript.contains(&format!("  ⚡ fetch_video path='{}'\n\n", video)));
        assert!(transcript
            .lines()
            .any(|line| line == format!("  ✓ [fetch_video] {}", host_path.display())));
        assert!(transcript.ends_with(&format!("🤖 {}\n\n", answer)));
        assert!(transcript
            .lines()
            .any(|line| line.starts_with(&host_path.display().to_string())));

        let prompts = agent.provider().prompts.lock().unwrap();
        assert!(prompts.iter().all(|p| p == DEFAULT_PROMPT));
    }

    #[tokio::test]
    async fn test_session_error_ends_after_printing() {
        let sandbox = HostSandbox::new();
        let tools = SandboxTools::new(&sandbox, sandbox.output.path());
        let provider = ScriptedProvider::new(vec![]);
        let agent = Agent::with_config(provider, AgentConfig::default());

        let mut out = Vec::new();
        let err = run_session(&agent, &tools, "hi", &mut out).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(rendered(out), "--- Streaming steps ---\n\n");
    }

    #[tokio::test]
    async fn test_supervise_passes_result_through() {
        assert!(supervise(async { Ok(()) }).await.is_ok());

        let err = supervise(async { Err(Error::sandbox_failed("abc", "gone")) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SandboxFailed);
    }

    #[tokio::test]
    async fn test_supervise_catches_panic() {
        let err = supervise(async {
            if true {
                panic!("scene exploded");
            }
            Ok(())
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.message().contains("scene exploded"));
    }

    #[tokio::test]
    async fn test_interrupt_ends_session() {
        let session = std::future::pending::<Result<()>>();
        let delivered = async { Ok::<(), std::io::Error>(()) };

        let err = supervise_until(session, delivered).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.message().contains("interrupted"));
    }

    #[tokio::test]
    async fn test_missing_signal_handler_does_not_interrupt() {
        let session = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(())
        };
        let no_handler = async { Err::<(), _>(std::io::Error::other("signal driver unavailable")) };

        assert!(supervise_until(session, no_handler).await.is_ok());
    }
}
