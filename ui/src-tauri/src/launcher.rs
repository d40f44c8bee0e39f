//! Renderer process launch and supervision.

use crate::config::ShellConfig;
use crate::errors::{ConfigError, LaunchError};
use crate::forward::{forward_lines, OutputSink, StreamKind};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Spawns the renderer executable with the window handle as its only argument.
pub struct RendererLauncher<S: OutputSink + ?Sized> {
    program: PathBuf,
    working_dir: PathBuf,
    sink: Arc<S>,
}

impl<S: OutputSink + ?Sized> RendererLauncher<S> {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>, sink: Arc<S>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
            sink,
        }
    }

    pub fn from_config(config: &ShellConfig, sink: Arc<S>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.renderer_path.clone(),
            config.renderer_working_dir()?,
            sink,
        ))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The command that `launch` would run for `argument`.
    pub fn command(&self, argument: i32) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(argument.to_string())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        cmd
    }

    /// Spawn the renderer and start forwarding its output.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch(&self, argument: i32) -> Result<RendererProcess, LaunchError> {
        if !self.working_dir.is_dir() {
            return Err(LaunchError::WorkingDirMissing {
                path: self.working_dir.clone(),
            });
        }

        info!(
            event = "shell.renderer.spawn_started",
            program = %self.program.display(),
            argument = argument,
            working_dir = %self.working_dir.display()
        );

        let mut child = self
            .command(argument)
            .spawn()
            .map_err(|source| LaunchError::SpawnFailed {
                path: self.program.clone(),
                source,
            })?;
        let pid = child.id();

        info!(
            event = "shell.renderer.spawn_completed",
            program = %self.program.display(),
            pid = pid
        );

        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            let sink = Arc::clone(&self.sink);
            forwarders.push(tokio::spawn(async move {
                forward_lines(stdout, StreamKind::Stdout, sink).await
            }));
        }
        if let Some(stderr) = child.stderr.take() {
            let sink = Arc::clone(&self.sink);
            forwarders.push(tokio::spawn(async move {
                forward_lines(stderr, StreamKind::Stderr, sink).await
            }));
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let done = tokio::spawn(supervise(child, pid, stop_rx, forwarders));

        Ok(RendererProcess {
            pid,
            stop: Some(stop_tx),
            done,
        })
    }
}

async fn supervise(
    mut child: tokio::process::Child,
    pid: Option<u32>,
    stop: oneshot::Receiver<()>,
    forwarders: Vec<JoinHandle<usize>>,
) -> Option<ExitStatus> {
    // A dropped sender leaves the child running; only an explicit stop kills it.
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = stop => {
            info!(event = "shell.renderer.terminate_started", pid = pid);
            if let Err(e) = child.kill().await {
                warn!(event = "shell.renderer.terminate_failed", pid = pid, error = %e);
            }
            child.wait().await
        }
    };

    let mut lines = 0;
    for forwarder in forwarders {
        lines += forwarder.await.unwrap_or(0);
    }

    match status {
        Ok(status) => {
            info!(
                event = "shell.renderer.exited",
                pid = pid,
                code = status.code(),
                success = status.success(),
                lines = lines
            );
            Some(status)
        }
        Err(e) => {
            warn!(event = "shell.renderer.wait_failed", pid = pid, error = %e);
            None
        }
    }
}

/// A running renderer and its supervision task.
#[derive(Debug)]
pub struct RendererProcess {
    pid: Option<u32>,
    stop: Option<oneshot::Sender<()>>,
    done: JoinHandle<Option<ExitStatus>>,
}

impl RendererProcess {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_finished(&self) -> bool {
        self.done.is_finished()
    }

    /// Ask the supervisor to kill the renderer. Repeated calls are no-ops.
    pub fn terminate(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The supervisor is gone once the child has exited on its own.
            let _ = stop.send(());
        }
    }

    /// Wait for the renderer to exit and its output to drain.
    #[cfg(test)]
    pub(crate) async fn wait(mut self) -> Option<ExitStatus> {
        // Keep the stop sender alive while waiting so the child is not killed.
        let _stop = self.stop.take();
        (&mut self.done).await.ok().flatten()
    }
}
