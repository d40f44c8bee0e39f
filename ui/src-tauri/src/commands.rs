//! Commands callable from the window's page.

use crate::host::RendererStatus;
use crate::AppShell;
use tauri::{State, WebviewWindow};

/// Frame rate the page paces its animation loop to.
#[tauri::command]
pub fn target_frame_rate(shell: State<'_, AppShell>) -> u32 {
    shell.config().target_frame_rate
}

/// Renderer state of the calling window.
#[tauri::command]
pub fn renderer_status(window: WebviewWindow, shell: State<'_, AppShell>) -> RendererStatus {
    shell.status(window.label())
}
