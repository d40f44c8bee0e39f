//! Native window handle extraction and the integer encoding handed to the renderer.
//!
//! The renderer receives the handle as one signed 32-bit integer. Which 32 bits
//! end up in that integer depends on the byte order used to lay the handle out
//! and read it back, so the order is an explicit setting rather than an
//! accident of the machine the shell runs on.

use crate::errors::HandleError;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use serde::{Deserialize, Serialize};

/// Byte order used to lay out a handle before decoding it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Fixed little-endian, independent of the host.
    #[default]
    Little,
    /// Fixed big-endian, independent of the host.
    Big,
    /// Whatever the running host uses.
    Native,
}

impl ByteOrder {
    /// Order of the running host.
    pub fn host() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Collapse `Native` into the concrete host order.
    pub fn resolve(self) -> Self {
        match self {
            ByteOrder::Native => Self::host(),
            order => order,
        }
    }
}

impl std::fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little"),
            ByteOrder::Big => write!(f, "big"),
            ByteOrder::Native => write!(f, "native"),
        }
    }
}

/// Platform window handle reduced to an integer value and its width in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeHandle {
    value: u64,
    width: usize,
}

impl NativeHandle {
    pub fn new(value: u64, width: usize) -> Self {
        Self { value, width }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Reduce a raw window handle to its identifying integer.
    ///
    /// HWND, NSView and wl_surface are pointer-sized; Xlib windows are
    /// `c_ulong` and XCB windows are 32-bit ids.
    pub fn from_raw(raw: &RawWindowHandle) -> Result<Self, HandleError> {
        const PTR: usize = std::mem::size_of::<usize>();

        match raw {
            RawWindowHandle::Win32(h) => Ok(Self::new(h.hwnd.get() as usize as u64, PTR)),
            RawWindowHandle::AppKit(h) => Ok(Self::new(h.ns_view.as_ptr() as usize as u64, PTR)),
            RawWindowHandle::Wayland(h) => Ok(Self::new(h.surface.as_ptr() as usize as u64, PTR)),
            RawWindowHandle::Xlib(h) => Ok(Self::new(
                h.window as u64,
                std::mem::size_of::<std::os::raw::c_ulong>(),
            )),
            RawWindowHandle::Xcb(h) => Ok(Self::new(u64::from(h.window.get()), 4)),
            other => Err(HandleError::Unsupported {
                kind: format!("{other:?}"),
            }),
        }
    }

    /// Lay the handle out as `width` bytes in the given order.
    pub fn to_bytes(&self, order: ByteOrder) -> Vec<u8> {
        let width = self.width.min(8);
        match order.resolve() {
            ByteOrder::Big => self.value.to_be_bytes()[8 - width..].to_vec(),
            _ => self.value.to_le_bytes()[..width].to_vec(),
        }
    }

    /// The integer passed to the renderer: the handle laid out and read back
    /// with the same order.
    pub fn to_argument(&self, order: ByteOrder) -> Result<i32, HandleError> {
        decode_i32(&self.to_bytes(order), order)
    }
}

/// Interpret the first four bytes as a signed 32-bit integer.
pub fn decode_i32(bytes: &[u8], order: ByteOrder) -> Result<i32, HandleError> {
    let head: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(HandleError::TooShort { len: bytes.len() })?;

    Ok(match order.resolve() {
        ByteOrder::Big => i32::from_be_bytes(head),
        _ => i32::from_le_bytes(head),
    })
}

/// Fetch the native handle of a window.
pub fn native_handle_of(
    label: &str,
    window: &impl HasWindowHandle,
) -> Result<NativeHandle, HandleError> {
    let handle = window
        .window_handle()
        .map_err(|e| HandleError::Unavailable {
            label: label.to_string(),
            message: e.to_string(),
        })?;
    NativeHandle::from_raw(&handle.as_raw())
}

/// Window stand-in exposing a fixed raw handle, or none.
#[cfg(test)]
pub(crate) struct FakeWindow(pub Option<RawWindowHandle>);

#[cfg(test)]
impl HasWindowHandle for FakeWindow {
    fn window_handle(
        &self,
    ) -> Result<raw_window_handle::WindowHandle<'_>, raw_window_handle::HandleError> {
        match self.0 {
            // SAFETY: the fake window owns no real resources.
            Some(raw) => Ok(unsafe { raw_window_handle::WindowHandle::borrow_raw(raw) }),
            None => Err(raw_window_handle::HandleError::Unavailable),
        }
    }
}
