//! Docker-backed sandbox via bollard
//!
//! One container per session: created and started by [`DockerSandbox::start`],
//! stopped and removed by [`DockerSandbox::shutdown`].

use crate::path::{EXPORT_DIR, SANDBOX_ROOT};
use crate::sandbox::{ExecOutput, Sandbox};
use bollard::{
    container::{
        Config, CreateContainerOptions, LogOutput, RemoveContainerOptions, StartContainerOptions,
        StopContainerOptions,
    },
    errors::Error as BollardError,
    exec::{CreateExecOptions, StartExecResults},
    models::HostConfig,
    Docker,
};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use vizcraft_error::{Error, Result};

/// Label applied to every vizcraft container
const MANAGED_LABEL: &str = "vizcraft.managed";

/// How the sandbox container is created
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Pre-built image with bash, coreutils and Manim installed
    pub image: String,
    /// User commands run as; root so `/workspace` is writable
    pub user: String,
    /// Named volume mounted at [`SANDBOX_ROOT`]
    pub workspace_volume: String,
    /// Absolute host directory mounted at [`EXPORT_DIR`]
    pub output_dir: PathBuf,
    /// Grace period before the container is killed on stop
    pub stop_timeout_secs: i64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "viz-agent-manim".to_string(),
            user: "root".to_string(),
            workspace_volume: "agent_workspace".to_string(),
            output_dir: PathBuf::from("output"),
            stop_timeout_secs: 10,
        }
    }
}

impl SandboxConfig {
    /// Bind specs for the workspace volume and the export directory
    pub fn binds(&self) -> Vec<String> {
        vec![
            format!("{}:{}:rw", self.workspace_volume, SANDBOX_ROOT),
            format!("{}:{}:rw", self.output_dir.display(), EXPORT_DIR),
        ]
    }

    fn container_config(&self) -> Config<String> {
        let labels = HashMap::from([(MANAGED_LABEL.to_string(), "true".to_string())]);

        let host_config = HostConfig {
            binds: Some(self.binds()),
            ..Default::default()
        };

        Config {
            image: Some(self.image.clone()),
            user: Some(self.user.clone()),
            working_dir: Some(SANDBOX_ROOT.to_string()),
            labels: Some(labels),
            host_config: Some(host_config),
            tty: Some(false),
            ..Default::default()
        }
    }
}

/// A running container, owned exclusively by the session that started it.
///
/// Call [`shutdown`](Self::shutdown) on every exit path. Dropping a sandbox
/// that was not shut down leaks the container; a warning names it.
pub struct DockerSandbox {
    docker: Docker,
    id: String,
    config: SandboxConfig,
    released: bool,
}

impl DockerSandbox {
    /// Connect to the Docker daemon, then create and start the container.
    pub async fn start(config: SandboxConfig) -> Result<Self> {
        let docker = Docker::connect_with_defaults().map_err(|e| {
            Error::sandbox_unavailable(format!("cannot connect to Docker: {}", e))
                .with_operation("sandbox::connect")
                .set_source(e)
        })?;

        docker.ping().await.map_err(|e| {
            Error::sandbox_unavailable(format!("Docker daemon did not answer: {}", e))
                .with_operation("sandbox::ping")
                .set_source(e)
        })?;

        match docker.inspect_image(&config.image).await {
            Ok(_) => {}
            Err(BollardError::DockerResponseServerError { status_code: 404, .. }) => {
                return Err(Error::sandbox_unavailable(format!(
                    "image '{}' not found locally; build it before running",
                    config.image
                ))
                .with_operation("sandbox::inspect_image"));
            }
            Err(e) => {
                return Err(Error::sandbox_unavailable(e.to_string())
                    .with_operation("sandbox::inspect_image")
                    .set_source(e));
            }
        }

        info!(image = %config.image, "creating sandbox container");
        let response = docker
            .create_container(None::<CreateContainerOptions<String>>, config.container_config())
            .await
            .map_err(|e| {
                Error::sandbox_unavailable(format!("failed to create container: {}", e))
                    .with_operation("sandbox::create")
                    .with_context("image", config.image.clone())
                    .set_source(e)
            })?;

        let id = response.id;
        for warning in &response.warnings {
            warn!(container = %id, "{}", warning);
        }

        // From here on the container exists, so failures go through shutdown.
        let sandbox = Self {
            docker,
            id,
            config,
            released: false,
        };

        let started = sandbox
            .docker
            .start_container(&sandbox.id, None::<StartContainerOptions<String>>)
            .await;
        if let Err(e) = started {
            let err = Error::sandbox_unavailable(format!("failed to start container: {}", e))
                .with_operation("sandbox::start")
                .with_context("container", sandbox.id.clone())
                .set_source(e);
            if let Err(cleanup) = sandbox.shutdown().await {
                warn!("cleanup after failed start: {}", cleanup);
            }
            return Err(err);
        }

        info!(container = %sandbox.short_id(), "sandbox started");
        Ok(sandbox)
    }

    fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(12)]
    }

    /// Stop and remove the container.
    ///
    /// Removal is attempted even if stopping fails; the first error wins.
    pub async fn shutdown(mut self) -> Result<()> {
        self.released = true;
        info!(container = %self.short_id(), "stopping sandbox");

        let stopped = match self
            .docker
            .stop_container(
                &self.id,
                Some(StopContainerOptions {
                    t: self.config.stop_timeout_secs,
                }),
            )
            .await
        {
            // 304: already stopped
            Ok(()) | Err(BollardError::DockerResponseServerError { status_code: 304, .. }) => Ok(()),
            Err(e) => Err(Error::sandbox_failed(
                self.id.clone(),
                format!("failed to stop container: {}", e),
            )
            .with_operation("sandbox::stop")
            .set_source(e)),
        };

        let removed = self
            .docker
            .remove_container(
                &self.id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| {
                Error::sandbox_failed(self.id.clone(), format!("failed to remove container: {}", e))
                    .with_operation("sandbox::remove")
                    .set_source(e)
            });

        if stopped.is_ok() && removed.is_ok() {
            info!(container = %self.short_id(), "sandbox removed");
        }
        stopped.and(removed)
    }
}

impl Sandbox for DockerSandbox {
    async fn exec(&self, command: &[String]) -> Result<ExecOutput> {
        debug!(container = %self.short_id(), ?command, "exec");

        let exec_config = CreateExecOptions {
            cmd: Some(command.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(&self.id, exec_config)
            .await
            .map_err(|e| {
                Error::sandbox_failed(self.id.clone(), e.to_string())
                    .with_operation("sandbox::create_exec")
                    .set_source(e)
            })?;

        let started = self.docker.start_exec(&exec.id, None).await.map_err(|e| {
            Error::sandbox_failed(self.id.clone(), e.to_string())
                .with_operation("sandbox::start_exec")
                .set_source(e)
        })?;

        // stdout and stderr interleaved in arrival order
        let mut output = Vec::new();
        match started {
            StartExecResults::Attached { output: mut stream, .. } => {
                while let Some(msg) = stream.next().await {
                    match msg {
                        Ok(LogOutput::StdOut { message })
                        | Ok(LogOutput::StdErr { message })
                        | Ok(LogOutput::Console { message }) => output.extend_from_slice(&message),
                        Ok(LogOutput::StdIn { .. }) => {}
                        Err(e) => {
                            return Err(Error::sandbox_failed(self.id.clone(), e.to_string())
                                .with_operation("sandbox::exec_output")
                                .set_source(e));
                        }
                    }
                }
            }
            StartExecResults::Detached => {
                return Err(Error::sandbox_failed(
                    self.id.clone(),
                    "exec was detached unexpectedly",
                )
                .with_operation("sandbox::start_exec"));
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await.map_err(|e| {
            Error::sandbox_failed(self.id.clone(), e.to_string())
                .with_operation("sandbox::inspect_exec")
                .set_source(e)
        })?;

        let exit_code = inspect.exit_code.unwrap_or(0);
        debug!(container = %self.short_id(), exit_code, bytes = output.len(), "exec finished");

        Ok(ExecOutput { exit_code, output })
    }
}

impl Drop for DockerSandbox {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                container = %self.id,
                "sandbox dropped without shutdown; remove it with `docker rm -f {}`",
                self.short_id()
            );
        }
    }
}
