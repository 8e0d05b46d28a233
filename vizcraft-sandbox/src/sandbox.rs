//! The execution interface every sandbox backend provides

use vizcraft_error::Result;

/// Exit status and combined stdout/stderr of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub output: Vec<u8>,
}

impl ExecOutput {
    pub fn new(exit_code: i64, output: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// An isolated environment that runs one command at a time.
///
/// `exec` returns `Err` only when the command could not be run at all.
/// A command that runs and fails is an `Ok` with a non-zero exit code.
#[allow(async_fn_in_trait)]
pub trait Sandbox {
    /// Run `command` (program followed by its arguments, no shell).
    async fn exec(&self, command: &[String]) -> Result<ExecOutput>;
}
