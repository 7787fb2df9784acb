// src/platform/windows.rs
//! Windows strategy: clipboard handle probe/reset over the Win32 clipboard
//! API, foreground window resolution, and a persistent registry flag that
//! keeps clipboard history enabled.

use std::ptr::{null, null_mut};

use async_trait::async_trait;
use tracing::debug;
use windows_sys::Win32::Foundation::ERROR_SUCCESS;
use windows_sys::Win32::System::DataExchange::{CloseClipboard, OpenClipboard};
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegSetValueExW, HKEY, HKEY_CURRENT_USER, KEY_SET_VALUE,
    REG_DWORD, REG_OPTION_NON_VOLATILE,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

use crate::platform::{process_name_for_pid, PlatformError, Strategy};

const CLIPBOARD_KEY: &str = "Software\\Microsoft\\Clipboard";
const HISTORY_VALUE: &str = "EnableClipboardHistory";

#[derive(Debug)]
pub struct WindowsStrategy;

impl WindowsStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsStrategy {
    fn default() -> Self {
        Self::new()
    }
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

#[async_trait]
impl Strategy for WindowsStrategy {
    fn label(&self) -> &'static str {
        "Windows"
    }

    /// Persist `EnableClipboardHistory = 1` under HKCU once per service run.
    async fn prepare(&self) -> Result<(), PlatformError> {
        let subkey = wide(CLIPBOARD_KEY);
        let value_name = wide(HISTORY_VALUE);
        let mut key: HKEY = null_mut();

        // SAFETY: all pointers are valid for the duration of each call; the
        // key handle is closed before the buffers go out of scope.
        unsafe {
            let status = RegCreateKeyExW(
                HKEY_CURRENT_USER,
                subkey.as_ptr(),
                0,
                null(),
                REG_OPTION_NON_VOLATILE,
                KEY_SET_VALUE,
                null(),
                &mut key,
                null_mut(),
            );
            if status != ERROR_SUCCESS {
                return Err(PlatformError::Registry(format!(
                    "RegCreateKeyExW returned {status}"
                )));
            }

            let data: u32 = 1;
            let status = RegSetValueExW(
                key,
                value_name.as_ptr(),
                0,
                REG_DWORD,
                &data as *const u32 as *const u8,
                std::mem::size_of::<u32>() as u32,
            );
            RegCloseKey(key);
            if status != ERROR_SUCCESS {
                return Err(PlatformError::Registry(format!(
                    "RegSetValueExW returned {status}"
                )));
            }
        }

        debug!("clipboard history flag persisted in registry");
        Ok(())
    }

    async fn probe(&self) -> Result<bool, PlatformError> {
        // Open and immediately close the clipboard; failure to open means
        // another process is holding it.
        unsafe {
            if OpenClipboard(null_mut()) == 0 {
                return Ok(false);
            }
            CloseClipboard();
        }
        Ok(true)
    }

    async fn foreground_app(&self) -> Option<String> {
        let pid = unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.is_null() {
                return None;
            }
            let mut pid: u32 = 0;
            GetWindowThreadProcessId(hwnd, &mut pid);
            pid
        };
        if pid == 0 {
            return None;
        }
        process_name_for_pid(pid)
    }

    async fn remediate(&self) -> Result<(), PlatformError> {
        // Force-close whatever handle is stuck open, then cycle the
        // clipboard once to reset its lock state.
        unsafe {
            CloseClipboard();
            if OpenClipboard(null_mut()) == 0 {
                return Err(PlatformError::Clipboard(
                    "clipboard could not be reopened during reset".to_string(),
                ));
            }
            CloseClipboard();
        }
        Ok(())
    }
}
