// Docker execution engine using Bollard
//
// The engine knows HOW a staged test file is executed: guarantee the image
// is present, create a container with the staging directory bind-mounted,
// run the install + pytest script, wait with a deadline, and hand the
// combined log stream back. It knows nothing about staging or output
// extraction.

use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::errors::{Error, Result};

/// Output captured from a finished container.
#[derive(Debug)]
pub struct ContainerOutput {
    pub exit_code: i64,
    /// stdout and stderr interleaved, lossily decoded as text.
    pub logs: String,
}

/// Container cleanup guard - guarantees removal on drop.
/// This keeps containers from leaking even when a later pipeline stage
/// fails or the task is cancelled.
struct ContainerGuard<'a> {
    docker: &'a Docker,
    container_id: String,
}

impl Drop for ContainerGuard<'_> {
    fn drop(&mut self) {
        // Cannot be async in Drop; removal is spawned best-effort and any
        // failure is logged rather than swallowed.
        let container_id = self.container_id.clone();
        let docker = self.docker.clone();

        tokio::spawn(async move {
            let remove_options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };

            if let Err(e) = docker.remove_container(&container_id, Some(remove_options)).await {
                warn!(container_id = %container_id, error = %e, "failed to remove container");
            }
        });
    }
}

/// Docker-backed execution engine.
///
/// The daemon handle is injected, so callers can share one connection and
/// tests can point the engine at whatever daemon they control.
pub struct DockerEngine {
    docker: Docker,
    config: RunnerConfig,
}

impl DockerEngine {
    /// Wrap an already established Docker handle.
    pub fn new(docker: Docker, config: RunnerConfig) -> Self {
        Self { docker, config }
    }

    /// Connect using the daemon's local defaults (unix socket or named pipe).
    pub fn connect(config: RunnerConfig) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(Error::Backend)?;
        Ok(Self::new(docker, config))
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Ensure the image is available locally, pulling it when missing.
    pub async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.docker.inspect_image(image).await.is_ok() {
            debug!(image = %image, "image already present");
            return Ok(());
        }

        info!(image = %image, "pulling image");
        let options = Some(CreateImageOptions {
            from_image: image,
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(progress) = stream.next().await {
            progress.map_err(|e| Error::ImageUnavailable {
                image: image.to_string(),
                source: e,
            })?;
        }

        info!(image = %image, "image pulled");
        Ok(())
    }

    /// Create, start and wait for a container that installs the declared
    /// packages and runs the test command against `basename` inside the
    /// bind-mounted staging directory.
    ///
    /// The wait and the log collection share the configured deadline; on
    /// expiry the container is killed and `ExecutionTimeout` is returned.
    /// The container is removed on every exit path via a drop guard.
    pub async fn run_container(
        &self,
        image: &str,
        host_dir: &Path,
        basename: &str,
    ) -> Result<ContainerOutput> {
        let container_name = format!("testdock-{}", Uuid::new_v4());
        let script = self.config.install_script(basename);

        let config = Config {
            image: Some(image.to_string()),
            cmd: Some(vec![
                "/bin/bash".to_string(),
                "-c".to_string(),
                script,
            ]),
            tty: Some(true),
            working_dir: Some(self.config.mount_target.clone()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            host_config: Some(bollard::models::HostConfig {
                binds: Some(vec![format!(
                    "{}:{}",
                    host_dir.display(),
                    self.config.mount_target
                )]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: container_name.as_str(),
            platform: None,
        };

        let container = self
            .docker
            .create_container(Some(create_options), config)
            .await
            .map_err(|e| Error::LaunchFailed {
                image: image.to_string(),
                source: e,
            })?;

        let container_id = container.id;
        // Guard set up immediately after creation, before anything can fail.
        let _guard = ContainerGuard {
            docker: &self.docker,
            container_id: container_id.clone(),
        };

        debug!(container_id = %container_id, image = %image, "starting container");
        self.docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Error::LaunchFailed {
                image: image.to_string(),
                source: e,
            })?;

        // Bounded wait: untrusted test code must not hold the pipeline
        // open forever.
        let wait_options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut wait_stream = self.docker.wait_container(&container_id, Some(wait_options));
        let timeout = self.config.timeout();
        let deadline = tokio::time::Instant::now() + timeout;

        let exit_code = match tokio::time::timeout_at(deadline, wait_stream.next()).await {
            Ok(Some(Ok(response))) => response.status_code,
            // Bollard reports non-zero container exits through the error
            // channel of the wait stream; a failing test run is still a
            // successful pipeline run.
            Ok(Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. }))) => code,
            Ok(Some(Err(e))) => return Err(Error::Backend(e)),
            Ok(None) => {
                warn!(container_id = %container_id, "wait stream ended without a status");
                -1
            }
            Err(_) => {
                warn!(container_id = %container_id, ?timeout, "deadline exceeded; killing container");
                if let Err(e) = self
                    .docker
                    .kill_container(&container_id, None::<KillContainerOptions<String>>)
                    .await
                {
                    warn!(container_id = %container_id, error = %e, "failed to kill timed-out container");
                }
                return Err(Error::ExecutionTimeout { timeout });
            }
        };

        let logs_options = Some(LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        });

        let mut logs_stream = self.docker.logs(&container_id, logs_options);

        // Log collection is charged against the same deadline as the wait;
        // a stalled daemon must not hang the pipeline after the container
        // has already exited.
        let collect = async {
            let mut logs = String::new();
            while let Some(chunk) = logs_stream.next().await {
                match chunk.map_err(Error::Backend)? {
                    // With a TTY attached the daemon interleaves both streams
                    // into Console frames; without one they arrive separately.
                    LogOutput::StdOut { message }
                    | LogOutput::StdErr { message }
                    | LogOutput::Console { message } => {
                        logs.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdIn { .. } => {}
                }
            }
            Ok::<String, Error>(logs)
        };

        let logs = match tokio::time::timeout_at(deadline, collect).await {
            Ok(collected) => collected?,
            Err(_) => {
                warn!(container_id = %container_id, ?timeout, "deadline exceeded while collecting logs");
                return Err(Error::ExecutionTimeout { timeout });
            }
        };

        debug!(container_id = %container_id, exit_code, "container finished");
        Ok(ContainerOutput { exit_code, logs })
        // _guard drops here and force-removes the container.
    }
}
