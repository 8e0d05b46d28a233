//! The five sandbox tools exposed to the model
//!
//! Every operation runs exactly one command and answers with text. A failing
//! command is reported in that text, not as an error: the model reads it and
//! decides what to do next.

use crate::path::{shell_quote, workspace_path, EXPORT_DIR, SANDBOX_ROOT};
use crate::sandbox::{ExecOutput, Sandbox};
use std::path::PathBuf;
use tracing::warn;
use vizcraft_error::Error;

/// Heredoc delimiter used by `write_file`
const HEREDOC_DELIMITER: &str = "FILEEOF";

pub struct SandboxTools<'a, S> {
    sandbox: &'a S,
    /// Host directory mounted at `/output`
    output_dir: PathBuf,
}

impl<'a, S: Sandbox> SandboxTools<'a, S> {
    pub fn new(sandbox: &'a S, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            sandbox,
            output_dir: output_dir.into(),
        }
    }

    /// Run a shell command verbatim with `bash -c`.
    pub async fn run_command(&self, command: &str) -> String {
        match self.exec(vec!["bash".into(), "-c".into(), command.to_string()]).await {
            Ok(out) => format!("Exit code: {}\n{}", out.exit_code, out.text()),
            Err(err) => runtime_error(err),
        }
    }

    /// Write `content` to `path` under the sandbox root.
    pub async fn write_file(&self, path: &str, content: &str) -> String {
        let clean = workspace_path(path);
        let dest = shell_quote(&format!("{}/{}", SANDBOX_ROOT, clean));

        // The heredoc always ends the file with a newline; truncate drops it
        // again so the file holds exactly `content`.
        let script = format!(
            "set -e\nmkdir -p \"$(dirname {dest})\"\ncat > {dest} << '{delim}'\n{content}\n{delim}\ntruncate -s -1 {dest}",
            dest = dest,
            delim = HEREDOC_DELIMITER,
            content = content,
        );

        match self.exec(vec!["bash".into(), "-c".into(), script]).await {
            Ok(out) if out.success() => format!("Wrote {}", clean),
            Ok(out) => format!("Error: {}", out.text()),
            Err(err) => runtime_error(err),
        }
    }

    pub async fn read_file(&self, path: &str) -> String {
        let clean = workspace_path(path);
        match self.exec(vec!["cat".into(), format!("{}/{}", SANDBOX_ROOT, clean)]).await {
            Ok(out) if out.success() => out.text(),
            Ok(out) => format!("Error: {}", out.text()),
            Err(err) => runtime_error(err),
        }
    }

    /// `ls -la` of a directory; the listing is returned whatever the exit code.
    pub async fn list_files(&self, path: &str) -> String {
        let clean = workspace_path(path);
        match self
            .exec(vec!["ls".into(), "-la".into(), format!("{}/{}", SANDBOX_ROOT, clean)])
            .await
        {
            Ok(out) => out.text(),
            Err(err) => runtime_error(err),
        }
    }

    /// Copy a rendered video to the export mount and return its host path.
    ///
    /// Absolute paths outside `/workspace` (e.g. `/tmp/media/...`) are used
    /// as given; everything else resolves under `/workspace`.
    pub async fn fetch_video(&self, container_path: &str) -> String {
        let clean = workspace_path(container_path);
        let filename = clean.rsplit('/').next().unwrap_or_default().to_string();

        let src = if container_path.starts_with('/') && !container_path.starts_with(SANDBOX_ROOT) {
            container_path.to_string()
        } else {
            format!("{}/{}", SANDBOX_ROOT, clean)
        };
        let dst = format!("{}/{}", EXPORT_DIR, filename);

        match self.exec(vec!["cp".into(), src, dst]).await {
            Ok(out) if out.success() => self.output_dir.join(&filename).display().to_string(),
            Ok(out) => format!("Error copying video: {}", out.text()),
            Err(err) => runtime_error(err),
        }
    }

    async fn exec(&self, command: Vec<String>) -> vizcraft_error::Result<ExecOutput> {
        self.sandbox.exec(&command).await
    }
}

/// The runtime itself failed; the model still only gets text.
fn runtime_error(err: Error) -> String {
    warn!("sandbox exec failed: {}", err);
    format!("Error: {}", err.message())
}
