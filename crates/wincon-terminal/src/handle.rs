//! Opens the console's input/output pseudo-files, captures whatever state
//! was installed before this process touched it, and restores that state
//! on disengage.

use crate::error::TerminalError;
#[cfg(windows)]
use tracing::{debug, info};

pub const INPUT_EXTENDED_FLAGS: u32 = 0x0080;
pub const INPUT_WINDOW: u32 = 0x0008;
pub const INPUT_MOUSE: u32 = 0x0010;

pub const OUTPUT_PROCESSED: u32 = 0x0001;
pub const OUTPUT_VT: u32 = 0x0004;
pub const OUTPUT_NO_AUTO_NEWLINE: u32 = 0x0008;
pub const OUTPUT_LVB_GRID_WORLDWIDE: u32 = 0x0010;

/// A window rectangle in console cell coordinates, as reported by
/// `GetConsoleScreenBufferInfo` (inclusive left/top/right/bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

/// Everything captured at `Init` time so `disengage` can put the console
/// back exactly as it found it.
#[derive(Debug, Clone, Copy)]
pub struct OriginalState {
    pub input_mode: u32,
    pub output_mode: u32,
    pub cursor_size: u8,
    pub cursor_visible: bool,
    pub buffer_width: i16,
    pub buffer_height: i16,
    pub window: Rect,
    pub max_window: (i16, i16),
    pub attributes: u16,
}

#[cfg(windows)]
mod sys {
    use super::*;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::Storage::FileSystem::{
        CreateFileW, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
    };
    use windows_sys::Win32::System::Console::{
        FillConsoleOutputAttribute, FillConsoleOutputCharacterW, GetConsoleCursorInfo, GetConsoleMode,
        GetConsoleScreenBufferInfo, GetLargestConsoleWindowSize, SetConsoleCursorInfo,
        SetConsoleCursorPosition, SetConsoleMode, SetConsoleScreenBufferSize, SetConsoleTextAttribute,
        SetConsoleTitleW, SetConsoleWindowInfo, WriteConsoleW, CONSOLE_CURSOR_INFO,
        CONSOLE_SCREEN_BUFFER_INFO, COORD, SMALL_RECT,
    };

    const GENERIC_READ: u32 = 0x8000_0000;
    const GENERIC_WRITE: u32 = 0x4000_0000;

    fn wide(s: &str) -> Vec<u16> {
        std::ffi::OsStr::new(s)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    fn open_pseudo(name: &str, access: u32, label: &'static str) -> Result<HANDLE, TerminalError> {
        let wide_name = wide(name);
        // SAFETY: `wide_name` is a valid NUL-terminated UTF-16 string; the
        // remaining arguments describe a plain shared, pre-existing handle
        // open with no security attributes, matching the console pseudo-file
        // contract documented for `CONIN$`/`CONOUT$`.
        let handle = unsafe {
            CreateFileW(
                wide_name.as_ptr(),
                access,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                std::ptr::null(),
                OPEN_EXISTING,
                0,
                std::ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE || handle == 0 {
            return Err(TerminalError::HandleOpenFailed(label));
        }
        Ok(handle)
    }

    /// Open `CONIN$`/`CONOUT$`. If the output open fails after the input
    /// handle succeeded, the input handle is closed before returning so no
    /// handle leaks on the fatal path out of `Init`.
    pub fn open_console_handles() -> Result<(HANDLE, HANDLE), TerminalError> {
        let input = open_pseudo("CONIN$", GENERIC_READ | GENERIC_WRITE, "input")?;
        match open_pseudo("CONOUT$", GENERIC_READ | GENERIC_WRITE, "output") {
            Ok(output) => Ok((input, output)),
            Err(e) => {
                // SAFETY: `input` was just returned by a successful CreateFileW.
                unsafe {
                    CloseHandle(input);
                }
                Err(e)
            }
        }
    }

    pub fn close_handle(handle: HANDLE) {
        // SAFETY: caller guarantees `handle` is an owned, still-open handle.
        unsafe {
            CloseHandle(handle);
        }
    }

    pub fn get_mode(handle: HANDLE, label: &'static str) -> Result<u32, TerminalError> {
        let mut mode = 0u32;
        // SAFETY: `handle` is a valid console handle, `mode` is a valid out-param.
        let ok = unsafe { GetConsoleMode(handle, &mut mode) };
        if ok == 0 {
            return Err(TerminalError::ModeQueryFailed(label));
        }
        Ok(mode)
    }

    pub fn set_mode(handle: HANDLE, mode: u32, label: &'static str) -> Result<(), TerminalError> {
        // SAFETY: `handle` is a valid console handle.
        let ok = unsafe { SetConsoleMode(handle, mode) };
        if ok == 0 {
            return Err(TerminalError::ModeSetFailed(label));
        }
        Ok(())
    }

    pub fn get_buffer_info(output: HANDLE) -> Result<CONSOLE_SCREEN_BUFFER_INFO, TerminalError> {
        let mut info = CONSOLE_SCREEN_BUFFER_INFO {
            dwSize: COORD { X: 0, Y: 0 },
            dwCursorPosition: COORD { X: 0, Y: 0 },
            wAttributes: 0,
            srWindow: SMALL_RECT {
                Left: 0,
                Top: 0,
                Right: 0,
                Bottom: 0,
            },
            dwMaximumWindowSize: COORD { X: 0, Y: 0 },
        };
        // SAFETY: `output` is a valid console output handle, `info` is a
        // valid out-param of the exact struct shape the API expects.
        let ok = unsafe { GetConsoleScreenBufferInfo(output, &mut info) };
        if ok == 0 {
            return Err(TerminalError::BufferInfoFailed);
        }
        Ok(info)
    }

    pub fn get_cursor_info(output: HANDLE) -> Result<(u8, bool), TerminalError> {
        let mut info = CONSOLE_CURSOR_INFO {
            dwSize: 25,
            bVisible: 0,
        };
        // SAFETY: `output` is a valid console output handle.
        let ok = unsafe { GetConsoleCursorInfo(output, &mut info) };
        if ok == 0 {
            return Err(TerminalError::CursorInfoFailed);
        }
        Ok((info.dwSize as u8, info.bVisible != 0))
    }

    pub fn set_cursor_info(output: HANDLE, size: u8, visible: bool) -> Result<(), TerminalError> {
        let info = CONSOLE_CURSOR_INFO {
            dwSize: size.max(1) as u32,
            bVisible: if visible { 1 } else { 0 },
        };
        // SAFETY: `output` is a valid console output handle.
        let ok = unsafe { SetConsoleCursorInfo(output, &info) };
        if ok == 0 {
            return Err(TerminalError::CursorInfoFailed);
        }
        Ok(())
    }

    pub fn set_buffer_size(output: HANDLE, width: i16, height: i16) -> Result<(), TerminalError> {
        // SAFETY: `output` is a valid console output handle.
        let ok = unsafe { SetConsoleScreenBufferSize(output, COORD { X: width, Y: height }) };
        if ok == 0 {
            return Err(TerminalError::ResizeFailed);
        }
        Ok(())
    }

    pub fn set_window_rect(output: HANDLE, rect: Rect) -> Result<(), TerminalError> {
        let small_rect = SMALL_RECT {
            Left: rect.left,
            Top: rect.top,
            Right: rect.right,
            Bottom: rect.bottom,
        };
        // SAFETY: `output` is a valid console output handle.
        let ok = unsafe { SetConsoleWindowInfo(output, 1, &small_rect) };
        if ok == 0 {
            return Err(TerminalError::ResizeFailed);
        }
        Ok(())
    }

    pub fn set_text_attribute(output: HANDLE, attr: u16) -> Result<(), TerminalError> {
        // SAFETY: `output` is a valid console output handle.
        let ok = unsafe { SetConsoleTextAttribute(output, attr) };
        if ok == 0 {
            return Err(TerminalError::WriteFailed);
        }
        Ok(())
    }

    pub fn set_cursor_position(output: HANDLE, x: i16, y: i16) -> Result<(), TerminalError> {
        // SAFETY: `output` is a valid console output handle.
        let ok = unsafe { SetConsoleCursorPosition(output, COORD { X: x, Y: y }) };
        if ok == 0 {
            return Err(TerminalError::WriteFailed);
        }
        Ok(())
    }

    pub fn write_console(output: HANDLE, utf16: &[u16]) -> Result<(), TerminalError> {
        let mut written = 0u32;
        // SAFETY: `output` is a valid console output handle, `utf16` is a
        // valid slice for its own length, `written` is a valid out-param.
        let ok = unsafe {
            WriteConsoleW(
                output,
                utf16.as_ptr() as *const _,
                utf16.len() as u32,
                &mut written,
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(TerminalError::WriteFailed);
        }
        Ok(())
    }

    /// Blank the entire `width`x`height` buffer with `attr` and home the
    /// cursor to (0,0), via `FillConsoleOutputCharacterW`/
    /// `FillConsoleOutputAttribute` rather than a VT escape: the legacy
    /// output mode has no `ENABLE_VIRTUAL_TERMINAL_PROCESSING` bit set, so
    /// `WriteConsoleW` never interprets escape sequences in that mode.
    pub fn clear_screen_legacy(output: HANDLE, width: i16, height: i16, attr: u16) -> Result<(), TerminalError> {
        let length = (width.max(0) as u32).saturating_mul(height.max(0) as u32);
        let origin = COORD { X: 0, Y: 0 };
        let mut written = 0u32;
        // SAFETY: `output` is a valid console output handle, `origin` is
        // within the buffer's own bounds (0,0), `written` is a valid
        // out-param.
        let ok = unsafe { FillConsoleOutputCharacterW(output, ' ' as u16, length, origin, &mut written) };
        if ok == 0 {
            return Err(TerminalError::WriteFailed);
        }
        // SAFETY: same as above.
        let ok = unsafe { FillConsoleOutputAttribute(output, attr, length, origin, &mut written) };
        if ok == 0 {
            return Err(TerminalError::WriteFailed);
        }
        set_cursor_position(output, 0, 0)
    }

    pub fn largest_window_size(output: HANDLE) -> (i16, i16) {
        // SAFETY: `output` is a valid console output handle.
        let size = unsafe { GetLargestConsoleWindowSize(output) };
        (size.X, size.Y)
    }

    pub fn set_title(title: &str) -> Result<(), TerminalError> {
        let wide_title = wide(title);
        // SAFETY: `wide_title` is NUL-terminated UTF-16.
        let ok = unsafe { SetConsoleTitleW(wide_title.as_ptr()) };
        if ok == 0 {
            return Err(TerminalError::TitleFailed);
        }
        Ok(())
    }
}

#[cfg(not(windows))]
mod sys {
    use super::*;

    pub type Handle = isize;

    pub fn open_console_handles() -> Result<(Handle, Handle), TerminalError> {
        Err(TerminalError::HandleOpenFailed("input"))
    }
    pub fn close_handle(_handle: Handle) {}
    pub fn get_mode(_handle: Handle, label: &'static str) -> Result<u32, TerminalError> {
        Err(TerminalError::ModeQueryFailed(label))
    }
    pub fn set_mode(_handle: Handle, _mode: u32, label: &'static str) -> Result<(), TerminalError> {
        Err(TerminalError::ModeSetFailed(label))
    }
    pub fn get_buffer_info(_output: Handle) -> Result<(), TerminalError> {
        Err(TerminalError::BufferInfoFailed)
    }
}

#[cfg(windows)]
pub use sys::{
    clear_screen_legacy, close_handle, get_buffer_info, get_cursor_info, get_mode, largest_window_size,
    open_console_handles, set_buffer_size, set_cursor_info, set_cursor_position, set_mode,
    set_text_attribute, set_title, set_window_rect, write_console,
};
#[cfg(windows)]
pub use windows_sys::Win32::Foundation::HANDLE;

/// Owns the input/output handles for one engaged session and the state
/// captured from them at open time, so `disengage` can restore it verbatim.
pub struct HandleManager {
    #[cfg(windows)]
    pub input: HANDLE,
    #[cfg(windows)]
    pub output: HANDLE,
    pub original: OriginalState,
}

#[cfg(windows)]
impl HandleManager {
    pub fn open() -> Result<Self, TerminalError> {
        let (input, output) = open_console_handles()?;
        let input_mode = get_mode(input, "input")?;
        let output_mode = get_mode(output, "output")?;
        let (cursor_size, cursor_visible) = get_cursor_info(output)?;
        let info = get_buffer_info(output)?;

        let original = OriginalState {
            input_mode,
            output_mode,
            cursor_size,
            cursor_visible,
            buffer_width: info.dwSize.X,
            buffer_height: info.dwSize.Y,
            window: Rect {
                left: info.srWindow.Left,
                top: info.srWindow.Top,
                right: info.srWindow.Right,
                bottom: info.srWindow.Bottom,
            },
            max_window: (info.dwMaximumWindowSize.X, info.dwMaximumWindowSize.Y),
            attributes: info.wAttributes,
        };

        info!(
            target: "terminal.handle",
            buffer_width = original.buffer_width,
            buffer_height = original.buffer_height,
            "captured original console state"
        );

        Ok(HandleManager {
            input,
            output,
            original,
        })
    }

    pub fn apply_input_mode(&self, mouse_enabled: bool) -> Result<(), TerminalError> {
        let mut mode = INPUT_EXTENDED_FLAGS | INPUT_WINDOW;
        if mouse_enabled {
            mode |= INPUT_MOUSE;
        }
        set_mode(self.input, mode, "input")
    }

    pub fn apply_output_mode(&self, vt_capable: bool) -> Result<(), TerminalError> {
        let mode = if vt_capable {
            OUTPUT_PROCESSED | OUTPUT_VT | OUTPUT_NO_AUTO_NEWLINE | OUTPUT_LVB_GRID_WORLDWIDE
        } else {
            0
        };
        set_mode(self.output, mode, "output")
    }

    /// Reread the output mode after attempting to set the VT bit, returning
    /// whether it actually stuck.
    pub fn vt_mode_stuck(&self) -> bool {
        match get_mode(self.output, "output") {
            Ok(mode) => mode & OUTPUT_VT != 0,
            Err(_) => {
                debug!(target: "terminal.mode", "output mode query failed during VT probe, assuming unstuck");
                false
            }
        }
    }

    /// Current on-screen window dimensions in cells, derived from the
    /// visible window rectangle rather than the (possibly much larger)
    /// scrollback buffer size.
    pub fn viewport(&self) -> Result<(usize, usize), TerminalError> {
        let info = get_buffer_info(self.output)?;
        let w = (info.srWindow.Right - info.srWindow.Left + 1).max(0) as usize;
        let h = (info.srWindow.Bottom - info.srWindow.Top + 1).max(0) as usize;
        Ok((w, h))
    }

    pub fn largest_window(&self) -> (i16, i16) {
        largest_window_size(self.output)
    }

    pub fn resize_buffer_and_window(&self, w: i16, h: i16) -> Result<(), TerminalError> {
        debug!(target: "terminal.mode", width = w, height = h, "resizing console buffer and window");
        set_buffer_size(self.output, w, h)?;
        set_window_rect(
            self.output,
            Rect {
                left: 0,
                top: 0,
                right: w - 1,
                bottom: h - 1,
            },
        )
    }

    pub fn restore(&self) -> Result<(), TerminalError> {
        info!(target: "terminal.mode", "restoring original console state");
        set_mode(self.input, self.original.input_mode, "input")?;
        set_mode(self.output, self.original.output_mode, "output")?;
        set_cursor_info(self.output, self.original.cursor_size, self.original.cursor_visible)?;
        set_buffer_size(self.output, self.original.buffer_width, self.original.buffer_height)?;
        set_text_attribute(self.output, self.original.attributes)?;
        Ok(())
    }
}

#[cfg(windows)]
impl Drop for HandleManager {
    fn drop(&mut self) {
        close_handle(self.input);
        close_handle(self.output);
    }
}

#[cfg(not(windows))]
impl HandleManager {
    pub fn open() -> Result<Self, TerminalError> {
        Err(TerminalError::HandleOpenFailed("input"))
    }
}
