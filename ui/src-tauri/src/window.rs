//! Window creation and the ready-to-launch handshake.

use crate::AppShell;
use tauri::webview::PageLoadEvent;
use tauri::{AppHandle, Manager, Runtime, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use tracing::{info, warn};

/// Fixed local page every window loads.
pub const CONTENT_PAGE: &str = "index.html";

/// Create one hidden window; it is shown and handed to a renderer once its
/// page has loaded.
pub fn create_window<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<WebviewWindow<R>> {
    let shell = app.state::<AppShell>();
    let label = shell.next_window_label();
    let window_config = &shell.config().window;

    info!(event = "shell.window.create_started", window = %label);

    WebviewWindowBuilder::new(app, &label, WebviewUrl::App(CONTENT_PAGE.into()))
        .title(&window_config.title)
        .inner_size(window_config.width, window_config.height)
        .visible(false)
        .on_page_load(|window, payload| {
            if matches!(payload.event(), PageLoadEvent::Finished) {
                window_ready(&window);
            }
        })
        .build()
}

fn window_ready<R: Runtime>(window: &WebviewWindow<R>) {
    let label = window.label().to_string();

    if let Err(e) = window.show() {
        warn!(event = "shell.window.show_failed", window = %label, error = %e);
    }

    // Page-load callbacks run outside the async runtime the launcher spawns on.
    let runtime = tauri::async_runtime::handle();
    let _guard = runtime.inner().enter();
    window.state::<AppShell>().window_ready(&label, window);
}
