//! Desktop shell that hosts a webview window and hands its native handle to
//! an external renderer process.

pub mod commands;
pub mod config;
pub mod errors;
pub mod forward;
pub mod handle;
pub mod host;
pub mod launcher;
pub mod logging;
pub mod window;

use crate::config::ShellConfig;
use crate::errors::ShellError;
use crate::forward::ConsoleSink;
use crate::host::{keeps_running_without_windows, Platform, Shell};
use crate::launcher::RendererLauncher;
use std::sync::Arc;
use tauri::{Manager, RunEvent, WindowEvent};
use tracing::info;

/// Shell state as managed by the running app.
pub type AppShell = Shell<ConsoleSink>;

fn build_shell() -> Result<AppShell, Box<dyn ShellError>> {
    let config = ShellConfig::load().map_err(|e| Box::new(e) as Box<dyn ShellError>)?;
    let sink = Arc::new(ConsoleSink::new(config.output_tag.clone()));
    let launcher = RendererLauncher::from_config(&config, sink)
        .map_err(|e| Box::new(e) as Box<dyn ShellError>)?;

    info!(
        event = "shell.config.loaded",
        renderer = %launcher.program().display(),
        working_dir = %launcher.working_dir().display(),
        byte_order = %config.handle_byte_order,
        target_frame_rate = config.target_frame_rate
    );

    Ok(Shell::new(config, launcher))
}

pub fn run() {
    logging::init_logging();

    let shell = match build_shell() {
        Ok(shell) => shell,
        Err(e) => {
            errors::report_error("shell.config.load_failed", None, &*e);
            eprintln!("renderer-shell: {e}");
            std::process::exit(1);
        }
    };

    let app = tauri::Builder::default()
        .manage(shell)
        .invoke_handler(tauri::generate_handler![
            commands::target_frame_rate,
            commands::renderer_status
        ])
        .setup(|app| {
            window::create_window(app.handle())?;
            Ok(())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::Destroyed = event {
                window.state::<AppShell>().window_destroyed(window.label());
            }
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|_app, event| match event {
        #[cfg(target_os = "macos")]
        RunEvent::Reopen { .. } => {
            if host::should_create_on_activate(_app.webview_windows().len()) {
                if let Err(e) = window::create_window(_app) {
                    tracing::error!(event = "shell.window.create_failed", error = %e);
                }
            }
        }
        RunEvent::ExitRequested { code: None, api, .. }
            if keeps_running_without_windows(Platform::current()) =>
        {
            info!(event = "shell.app.resident_without_windows");
            api.prevent_exit();
        }
        _ => {}
    });
}
