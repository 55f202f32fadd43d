use anyhow::anyhow;
use tracing::{error, instrument};
use windows::{
    core::PWSTR,
    Win32::{
        Foundation::{CloseHandle, BOOL, E_ACCESSDENIED, HANDLE, HWND},
        System::Threading::{
            OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
            PROCESS_QUERY_LIMITED_INFORMATION,
        },
        UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId},
    },
};

use super::{clean_process_name, ActiveWindowData, WindowError, WindowManager};

fn os_error(context: &str, e: windows::core::Error) -> WindowError {
    if e.code() == E_ACCESSDENIED {
        WindowError::AccessDenied(format!("{context}: {e}"))
    } else {
        WindowError::Os(anyhow!("{context}: {e}"))
    }
}

#[instrument]
pub fn get_active() -> Result<ActiveWindowData, WindowError> {
    let window = unsafe { GetForegroundWindow() };

    if window.is_invalid() {
        return Err(WindowError::NoForegroundWindow);
    }

    let mut process_id = 0u32;
    unsafe { GetWindowThreadProcessId(window, Some(&mut process_id)) };
    if process_id == 0 {
        // The window has been destroyed between the two calls.
        return Err(WindowError::NoForegroundWindow);
    }

    let mut title_buffer: [u16; 512] = [0; 512];
    let window_title = unsafe { get_window_title(window, &mut title_buffer) };

    let process_handle =
        unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, BOOL::from(false), process_id) }
            .map_err(|e| os_error("Failed to open process", e))?;

    let mut path_buffer: [u16; 4096] = [0; 4096];
    let process_path = unsafe { get_window_process_path(process_handle, &mut path_buffer) };

    if let Err(e) = unsafe { CloseHandle(process_handle) } {
        error!("Failed to close process handle {e:?}");
    }

    let process_path = process_path.map_err(|e| os_error("Failed to query process image", e))?;

    Ok(ActiveWindowData {
        window_title: window_title.into(),
        process_name: clean_process_name(&process_path).into(),
        process_id,
    })
}

unsafe fn get_window_process_path(
    process_handle: HANDLE,
    text: &mut [u16],
) -> windows::core::Result<String> {
    unsafe {
        let mut length = text.len() as u32;
        QueryFullProcessImageNameW(
            process_handle,
            PROCESS_NAME_WIN32,
            PWSTR(text.as_mut_ptr()),
            &mut length,
        )?;
        Ok(String::from_utf16_lossy(&text[..length as usize]))
    }
}

unsafe fn get_window_title(window_handle: HWND, text: &mut [u16]) -> String {
    let len = unsafe { GetWindowTextW(window_handle, text) };
    String::from_utf16_lossy(&text[..len.max(0) as usize])
}

pub struct WindowsWindowManager {}

impl WindowsWindowManager {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for WindowsWindowManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowManager for WindowsWindowManager {
    fn get_active_window_data(&mut self) -> Result<ActiveWindowData, WindowError> {
        get_active()
    }
}
