//! # vizcraft sandbox
//!
//! The isolated environment the agent works in, and the five tools that
//! reach into it.
//!
//! - **Path normalizer**: maps model-supplied paths onto `/workspace`
//! - **Sandbox**: anything that can run one command and report exit code + output
//! - **DockerSandbox**: a container owned for the lifetime of a session
//! - **SandboxTools**: `run_command`, `write_file`, `read_file`, `list_files`, `fetch_video`

pub mod docker;
pub mod path;
pub mod sandbox;
pub mod tools;

pub use docker::{DockerSandbox, SandboxConfig};
pub use path::{shell_quote, workspace_path, EXPORT_DIR, SANDBOX_ROOT};
pub use sandbox::{ExecOutput, Sandbox};
pub use tools::SandboxTools;
