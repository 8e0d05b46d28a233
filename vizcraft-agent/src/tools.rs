//! Tool registry: the seam between the agent loop and whatever executes tools

use serde::Deserialize;
use serde_json::json;
use vizcraft_llm::{ToolCall, ToolDefinition};
use vizcraft_sandbox::{Sandbox, SandboxTools};

/// Names of the five video tools, in registration order
pub const TOOL_NAMES: [&str; 5] = [
    "run_command",
    "write_file",
    "read_file",
    "list_files",
    "fetch_video",
];

/// A set of tools the model may call.
#[allow(async_fn_in_trait)]
pub trait Toolset {
    /// Definitions advertised to the model
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run one call and return its text result.
    ///
    /// `None` means the tool name is not part of this set. Bad arguments are
    /// still `Some`, with an error message for the model.
    async fn invoke(&self, call: &ToolCall) -> Option<String>;
}

/// The five tools with their JSON schemas
pub fn video_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new("run_command", "Execute a shell command in the Docker container.")
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string" }
                },
                "required": ["command"]
            })),
        ToolDefinition::new(
            "write_file",
            "Write a file inside the Docker container. Path can be relative (e.g. 'scene.py') or absolute ('/workspace/scene.py').",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["path", "content"]
        })),
        ToolDefinition::new(
            "read_file",
            "Read a file from the Docker container. Path can be relative or absolute (/workspace/...).",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" }
            },
            "required": ["path"]
        })),
        ToolDefinition::new(
            "list_files",
            "List files in a directory inside the Docker container. Path can be relative or absolute (/workspace/...).",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "default": "." }
            },
            "required": []
        })),
        ToolDefinition::new(
            "fetch_video",
            "Copy a video file from the container to the host output directory. \
             Pass the path in the container, e.g. 'media/videos/scene/1080p60/Scene.mp4' \
             (relative to /workspace) or '/tmp/media/videos/...' (absolute). \
             Returns the absolute path to the video on the host.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "container_path": { "type": "string" }
            },
            "required": ["container_path"]
        })),
    ]
}

/// A call to one of the video tools with its decoded arguments
#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
enum VideoToolCall {
    RunCommand {
        command: String,
    },
    WriteFile {
        path: String,
        content: String,
    },
    ReadFile {
        path: String,
    },
    ListFiles {
        #[serde(default = "current_dir")]
        path: String,
    },
    FetchVideo {
        container_path: String,
    },
}

fn current_dir() -> String {
    ".".to_string()
}

impl VideoToolCall {
    /// `None` for names outside [`TOOL_NAMES`]; `Err` for unusable arguments.
    fn parse(call: &ToolCall) -> Option<Result<Self, String>> {
        if !TOOL_NAMES.contains(&call.name.as_str()) {
            return None;
        }

        let parsed = call
            .parse_arguments::<serde_json::Value>()
            .and_then(|arguments| {
                serde_json::from_value(json!({ "name": call.name, "arguments": arguments }))
            })
            .map_err(|e| format!("Error: invalid arguments for {}: {}", call.name, e));
        Some(parsed)
    }
}

impl<S: Sandbox> Toolset for SandboxTools<'_, S> {
    fn definitions(&self) -> Vec<ToolDefinition> {
        video_tool_definitions()
    }

    async fn invoke(&self, call: &ToolCall) -> Option<String> {
        let call = match VideoToolCall::parse(call)? {
            Ok(call) => call,
            Err(message) => return Some(message),
        };

        let result = match call {
            VideoToolCall::RunCommand { command } => self.run_command(&command).await,
            VideoToolCall::WriteFile { path, content } => self.write_file(&path, &content).await,
            VideoToolCall::ReadFile { path } => self.read_file(&path).await,
            VideoToolCall::ListFiles { path } => self.list_files(&path).await,
            VideoToolCall::FetchVideo { container_path } => self.fetch_video(&container_path).await,
        };
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vizcraft_sandbox::ExecOutput;

    #[derive(Default)]
    struct RecordingSandbox {
        commands: Mutex<Vec<Vec<String>>>,
    }

    impl Sandbox for RecordingSandbox {
        async fn exec(&self, command: &[String]) -> vizcraft_error::Result<ExecOutput> {
            self.commands.lock().unwrap().push(command.to_vec());
            Ok(ExecOutput::new(0, "ok"))
        }
    }

    #[test]
    fn test_definitions_match_names() {
        let names: Vec<String> = video_tool_definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, TOOL_NAMES);
    }

    #[test]
    fn test_parse_list_files_default_path() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "list_files".into(),
            arguments: String::new(),
        };
        assert_eq!(
            VideoToolCall::parse(&call),
            Some(Ok(VideoToolCall::ListFiles { path: ".".into() }))
        );
    }

    #[test]
    fn test_parse_unknown_tool() {
        let call = ToolCall::new("call_1", "delete_everything", json!({}));
        assert_eq!(VideoToolCall::parse(&call), None);
    }

    #[test]
    fn test_parse_missing_argument() {
        let call = ToolCall::new("call_1", "write_file", json!({ "path": "scene.py" }));
        let err = VideoToolCall::parse(&call).unwrap().unwrap_err();
        assert!(err.starts_with("Error: invalid arguments for write_file:"));
        assert!(err.contains("content"));
    }

    #[test]
    fn test_parse_malformed_json() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "run_command".into(),
            arguments: "{\"command\": ".into(),
        };
        let err = VideoToolCall::parse(&call).unwrap().unwrap_err();
        assert!(err.starts_with("Error: invalid arguments for run_command:"));
    }

    #[tokio::test]
    async fn test_invoke_dispatches_to_sandbox() {
        let sandbox = RecordingSandbox::default();
        let tools = SandboxTools::new(&sandbox, "/host/output");

        let result = tools
            .invoke(&ToolCall::new("c1", "read_file", json!({ "path": "/workspace/scene.py" })))
            .await;
        assert_eq!(result.as_deref(), Some("ok"));

        let result = tools
            .invoke(&ToolCall::new("c2", "fetch_video", json!({ "container_path": "media/a.mp4" })))
            .await;
        assert_eq!(result.as_deref(), Some("/host/output/a.mp4"));

        let commands = sandbox.commands.lock().unwrap();
        assert_eq!(commands[0], vec!["cat".to_string(), "/workspace/scene.py".into()]);
        assert_eq!(commands[1][0], "cp");
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool_runs_nothing() {
        let sandbox = RecordingSandbox::default();
        let tools = SandboxTools::new(&sandbox, "/host/output");

        assert_eq!(tools.invoke(&ToolCall::new("c1", "rm", json!({}))).await, None);
        assert!(sandbox.commands.lock().unwrap().is_empty());
    }
}
