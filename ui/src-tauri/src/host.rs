//! Window host bookkeeping: activation policy, one launch per window and the
//! renderer processes owned by each window.

use crate::config::ShellConfig;
use crate::errors::report_error;
use crate::forward::OutputSink;
use crate::handle::native_handle_of;
use crate::launcher::{RendererLauncher, RendererProcess};
use raw_window_handle::HasWindowHandle;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

pub const WINDOW_LABEL_PREFIX: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }
}

/// macOS apps stay resident with no windows; everything else quits.
pub fn keeps_running_without_windows(platform: Platform) -> bool {
    platform == Platform::MacOs
}

/// An activation must leave at least one window open.
pub fn should_create_on_activate(open_windows: usize) -> bool {
    open_windows == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RendererStatus {
    pub launched: bool,
    pub running: bool,
    pub pid: Option<u32>,
}

#[derive(Debug, Default)]
pub struct RendererRegistry {
    windows_created: u32,
    /// Windows that already handed their handle to a renderer.
    launched: HashSet<String>,
    running: HashMap<String, RendererProcess>,
}

impl RendererRegistry {
    /// `main` for the first window, then `main-2`, `main-3`, ...
    pub fn next_window_label(&mut self) -> String {
        self.windows_created += 1;
        match self.windows_created {
            1 => WINDOW_LABEL_PREFIX.to_string(),
            n => format!("{WINDOW_LABEL_PREFIX}-{n}"),
        }
    }

    /// True only the first time a given window asks.
    pub fn claim_launch(&mut self, label: &str) -> bool {
        self.launched.insert(label.to_string())
    }

    /// Record the renderer of a window. Returns the process back when the
    /// window was destroyed in the meantime.
    pub fn attach(&mut self, label: &str, process: RendererProcess) -> Option<RendererProcess> {
        if !self.launched.contains(label) {
            return Some(process);
        }
        self.running.insert(label.to_string(), process);
        None
    }

    pub fn detach(&mut self, label: &str) -> Option<RendererProcess> {
        self.launched.remove(label);
        self.running.remove(label)
    }

    pub fn status(&self, label: &str) -> RendererStatus {
        let process = self.running.get(label);
        RendererStatus {
            launched: self.launched.contains(label),
            running: process.is_some_and(|p| !p.is_finished()),
            pid: process.and_then(RendererProcess::pid),
        }
    }
}

/// Shared shell state, managed by the Tauri app.
pub struct Shell<S: OutputSink> {
    config: ShellConfig,
    launcher: RendererLauncher<S>,
    registry: Mutex<RendererRegistry>,
}

impl<S: OutputSink> Shell<S> {
    pub fn new(config: ShellConfig, launcher: RendererLauncher<S>) -> Self {
        Self {
            config,
            launcher,
            registry: Mutex::new(RendererRegistry::default()),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    fn registry(&self) -> MutexGuard<'_, RendererRegistry> {
        // The registry holds no invariants a panicking holder could break.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn next_window_label(&self) -> String {
        self.registry().next_window_label()
    }

    pub fn claim_launch(&self, label: &str) -> bool {
        let claimed = self.registry().claim_launch(label);
        if !claimed {
            info!(event = "shell.window.ready_repeated", window = label);
        }
        claimed
    }

    /// Spawn the renderer for a window. Failures are logged; the shell keeps
    /// running without a renderer for that window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch(&self, label: &str, argument: i32) {
        match self.launcher.launch(argument) {
            Ok(process) => {
                if let Some(mut orphan) = self.registry().attach(label, process) {
                    warn!(event = "shell.renderer.window_gone", window = label);
                    if self.config.kill_on_window_close {
                        orphan.terminate();
                    }
                }
            }
            Err(e) => report_error("shell.renderer.spawn_failed", Some(label), &e),
        }
    }

    /// A window became displayable: hand its native handle to a renderer,
    /// once per window. Returns whether a launch was attempted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn window_ready(&self, label: &str, window: &impl HasWindowHandle) -> bool {
        if !self.claim_launch(label) {
            return false;
        }

        let order = self.config.handle_byte_order;
        let argument = match native_handle_of(label, window).and_then(|h| h.to_argument(order)) {
            Ok(argument) => argument,
            Err(e) => {
                report_error("shell.window.handle_failed", Some(label), &e);
                return false;
            }
        };

        info!(
            event = "shell.window.ready",
            window = label,
            byte_order = %order,
            argument = argument
        );
        self.launch(label, argument);
        true
    }

    pub fn window_destroyed(&self, label: &str) {
        let Some(mut process) = self.registry().detach(label) else {
            return;
        };
        if self.config.kill_on_window_close {
            info!(event = "shell.window.destroyed", window = label, pid = process.pid());
            process.terminate();
        }
    }

    pub fn status(&self, label: &str) -> RendererStatus {
        self.registry().status(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::MemorySink;
    use crate::handle::FakeWindow;
    use std::sync::Arc;

    fn shell_with(config: ShellConfig, sink: Arc<MemorySink>) -> Shell<MemorySink> {
        let launcher = RendererLauncher::new(
            config.renderer_path.clone(),
            std::env::temp_dir(),
            sink,
        );
        Shell::new(config, launcher)
    }

    #[test]
    fn test_exit_policy() {
        assert!(keeps_running_without_windows(Platform::MacOs));
        assert!(!keeps_running_without_windows(Platform::Other));
    }

    #[test]
    fn test_activation_creates_only_when_empty() {
        assert!(should_create_on_activate(0));
        assert!(!should_create_on_activate(1));
    }

    #[test]
    fn test_window_labels() {
        let mut registry = RendererRegistry::default();
        assert_eq!(registry.next_window_label(), "main");
        assert_eq!(registry.next_window_label(), "main-2");
        assert_eq!(registry.next_window_label(), "main-3");
    }

    #[test]
    fn test_launch_claimed_once_per_window() {
        let mut registry = RendererRegistry::default();
        assert!(registry.claim_launch("main"));
        assert!(!registry.claim_launch("main"));
        assert!(!registry.claim_launch("main"));
        assert!(registry.claim_launch("main-2"));
    }

    #[test]
    fn test_status_of_unknown_window() {
        let registry = RendererRegistry::default();
        assert_eq!(
            registry.status("main"),
            RendererStatus {
                launched: false,
                running: false,
                pid: None,
            }
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_keeps_shell_usable() {
        let config = ShellConfig {
            renderer_path: std::env::temp_dir().join("no-such-renderer-binary"),
            ..ShellConfig::default()
        };
        let shell = shell_with(config, Arc::new(MemorySink::default()));

        assert!(shell.claim_launch("main"));
        shell.launch("main", 1);

        let status = shell.status("main");
        assert!(status.launched);
        assert!(!status.running);
        assert_eq!(status.pid, None);
        shell.window_destroyed("main");
    }

    #[tokio::test]
    async fn test_window_without_handle_launches_nothing() {
        let shell = shell_with(ShellConfig::default(), Arc::new(MemorySink::default()));

        assert!(!shell.window_ready("main", &FakeWindow(None)));
        assert_eq!(shell.status("main").pid, None);
        assert!(!shell.window_ready("main", &FakeWindow(None)));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;
        use tempfile::TempDir;

        fn sleeper(dir: &TempDir) -> std::path::PathBuf {
            let path = dir.path().join("sleeper.sh");
            std::fs::write(&path, "#!/bin/sh\nexec sleep 30\n").unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        async fn launched_shell(kill_on_window_close: bool, dir: &TempDir) -> Shell<MemorySink> {
            let config = ShellConfig {
                renderer_path: sleeper(dir),
                kill_on_window_close,
                ..ShellConfig::default()
            };
            let shell = shell_with(config, Arc::new(MemorySink::default()));
            assert!(shell.claim_launch("main"));

            // Retry while another test thread's fork still holds the script open.
            for _ in 0..20 {
                shell.launch("main", 1);
                if shell.status("main").pid.is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            shell
        }

        fn is_alive(pid: u32) -> bool {
            std::process::Command::new("kill")
                .args(["-0", &pid.to_string()])
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        }

        #[tokio::test]
        async fn test_window_destroyed_terminates_renderer() {
            let dir = TempDir::new().unwrap();
            let shell = launched_shell(true, &dir).await;
            let status = shell.status("main");
            assert!(status.running);
            let pid = status.pid.unwrap();

            shell.window_destroyed("main");
            assert_eq!(
                shell.status("main"),
                RendererStatus {
                    launched: false,
                    running: false,
                    pid: None,
                }
            );

            let mut alive = true;
            for _ in 0..100 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                alive = is_alive(pid);
                if !alive {
                    break;
                }
            }
            assert!(!alive);
        }

        #[tokio::test]
        async fn test_renderer_outlives_window_when_configured() {
            let dir = TempDir::new().unwrap();
            let shell = launched_shell(false, &dir).await;
            let pid = shell.status("main").pid.unwrap();

            shell.window_destroyed("main");
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert!(is_alive(pid));

            let _ = std::process::Command::new("kill")
                .args(["-9", &pid.to_string()])
                .status();
        }

        // `/bin/sh` runs the file named by its only argument, so the script
        // file is named after the expected handle value.
        #[tokio::test]
        async fn test_repeated_ready_spawns_one_renderer_with_handle_argument() {
            use raw_window_handle::{RawWindowHandle, XlibWindowHandle};

            let dir = TempDir::new().unwrap();
            let log = dir.path().join("launches.log");
            std::fs::write(
                dir.path().join("42"),
                format!("echo \"$0\" >> '{}'\n", log.display()),
            )
            .unwrap();

            let config = ShellConfig {
                renderer_path: std::path::PathBuf::from("/bin/sh"),
                ..ShellConfig::default()
            };
            let launcher = RendererLauncher::new(
                "/bin/sh",
                dir.path(),
                Arc::new(MemorySink::default()),
            );
            let shell = Shell::new(config, launcher);
            let window = FakeWindow(Some(RawWindowHandle::Xlib(XlibWindowHandle::new(42))));

            assert!(shell.window_ready("main", &window));
            assert!(!shell.window_ready("main", &window));

            for _ in 0..200 {
                if !shell.status("main").running {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
            assert!(!shell.window_ready("main", &window));
            assert!(shell.status("main").launched);

            let launches = std::fs::read_to_string(&log).unwrap();
            assert_eq!(launches, "42\n");
        }
    }
}
