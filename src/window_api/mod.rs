//! Contains logic for reading the foreground window from different environments.
//! [GenericWindowManager] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::{path::Path, sync::Arc};

use anyhow::Result;
use thiserror::Error;

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWindowData {
    /// Name of the window. For example 'bash in hello' or 'Document 1' or 'Vibing in YouTube -
    /// Google Chrome'
    pub window_title: Arc<str>,
    /// Executable name without its directory or extension. For example `chrome` or `nvim`
    pub process_name: Arc<str>,
    pub process_id: u32,
}

impl ActiveWindowData {
    /// Snapshot used whenever the foreground window can't be inspected.
    pub fn unknown() -> Self {
        Self {
            window_title: UNKNOWN.into(),
            process_name: UNKNOWN.into(),
            process_id: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum WindowError {
    /// Nothing has focus, e.g. the desktop is shown or the window closed between calls.
    #[error("No foreground window")]
    NoForegroundWindow,
    /// The OS refused to let us inspect the window or its process.
    #[error("Access denied while inspecting the foreground window: {0}")]
    AccessDenied(String),
    #[error(transparent)]
    Os(#[from] anyhow::Error),
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait WindowManager {
    fn get_active_window_data(&mut self) -> Result<ActiveWindowData, WindowError>;
}

/// Serves as a cross-compatible WindowManager implementation.
pub struct GenericWindowManager {
    inner: Box<dyn WindowManager + Send>,
}

impl GenericWindowManager {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowManager;
                Ok(Self {
                    inner: Box::new(WindowsWindowManager::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowManager;
                Ok(Self {
                    inner: Box::new(LinuxWindowManager::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No window backend was compiled in, rebuild with the `win` or `x11` feature"
                ))
            }
        }
    }
}

impl WindowManager for GenericWindowManager {
    fn get_active_window_data(&mut self) -> Result<ActiveWindowData, WindowError> {
        self.inner.get_active_window_data()
    }
}

/// Reduces a full executable path to its file stem, so `C:\Apps\chrome.exe` and
/// `/usr/bin/chrome` both become `chrome`.
pub fn clean_process_name(value: &str) -> String {
    // Windows paths have to be handled on every platform, Path only knows the native separator.
    let file_name = value.rsplit(['/', '\\']).next().unwrap_or(value);
    Path::new(file_name)
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| file_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_process_paths() {
        assert_eq!(clean_process_name(r"C:\Program Files\Google\chrome.exe"), "chrome");
        assert_eq!(clean_process_name("/usr/bin/nvim"), "nvim");
        assert_eq!(clean_process_name("notepad"), "notepad");
        assert_eq!(clean_process_name("Code.exe"), "Code");
    }
}
