//! Cursor positioning, visibility, shape and color, applied after every
//! draw pass.

use crate::error::TerminalError;
use crate::render::RenderMode;
use wincon_style::Color;

#[cfg(windows)]
use crate::handle::{self, HANDLE};

/// VT cursor shapes, `ESC [ n SP q` with `n` in 0..=6. Legacy rendering has
/// no equivalent concept and ignores this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    BlinkingBar,
    SteadyBar,
}

impl CursorStyle {
    fn vt_param(self) -> u8 {
        match self {
            CursorStyle::Default => 0,
            CursorStyle::BlinkingBlock => 1,
            CursorStyle::SteadyBlock => 2,
            CursorStyle::BlinkingUnderline => 3,
            CursorStyle::SteadyUnderline => 4,
            CursorStyle::BlinkingBar => 5,
            CursorStyle::SteadyBar => 6,
        }
    }
}

/// The logical cursor position. `(-1, -1)` means hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPos {
    pub x: i32,
    pub y: i32,
}

impl CursorPos {
    pub const HIDDEN: CursorPos = CursorPos { x: -1, y: -1 };

    pub fn is_hidden(self) -> bool {
        self.x < 0 || self.y < 0
    }
}

fn vt_cursor_color_escape(color: Color) -> String {
    match color {
        Color::Default => String::new(),
        Color::Reset => "\x1b]112\x07".to_string(),
        Color::Rgb(r, g, b) => format!("\x1b]12;#{r:02x}{g:02x}{b:02x}\x07"),
        // The cursor color OSC only has an RGB hex form; a palette index is
        // resolved through the same VGA16 table the style translator uses.
        Color::Indexed(i) => {
            let (r, g, b) = wincon_style::VGA16[(i % 16) as usize];
            format!("\x1b]12;#{r:02x}{g:02x}{b:02x}\x07")
        }
    }
}

#[cfg(windows)]
pub fn do_cursor(
    output: HANDLE,
    mode: RenderMode,
    pos: CursorPos,
    style: CursorStyle,
    color: Color,
) -> Result<(), TerminalError> {
    match mode {
        RenderMode::Legacy => {
            if pos.is_hidden() {
                handle::set_cursor_info(output, 25, false)
            } else {
                handle::set_cursor_position(output, pos.x as i16, pos.y as i16)?;
                handle::set_cursor_info(output, 25, true)
            }
        }
        RenderMode::Vt => {
            let mut out = String::new();
            if pos.is_hidden() {
                out.push_str("\x1b[?25l");
            } else {
                out.push_str(&format!("\x1b[{};{}H", pos.y + 1, pos.x + 1));
                out.push_str(&format!("\x1b[{} q", style.vt_param()));
                out.push_str(&vt_cursor_color_escape(color));
                out.push_str("\x1b[?25h");
            }
            let utf16: Vec<u16> = out.encode_utf16().collect();
            handle::write_console(output, &utf16)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_position_detected_by_either_negative_axis() {
        assert!(CursorPos::HIDDEN.is_hidden());
        assert!(CursorPos { x: -1, y: 0 }.is_hidden());
        assert!(!CursorPos { x: 0, y: 0 }.is_hidden());
    }

    #[test]
    fn cursor_color_reset_uses_112() {
        assert_eq!(vt_cursor_color_escape(Color::Reset), "\x1b]112\x07");
    }

    #[test]
    fn cursor_color_rgb_is_hex() {
        assert_eq!(
            vt_cursor_color_escape(Color::Rgb(0x1a, 0x2b, 0x3c)),
            "\x1b]12;#1a2b3c\x07"
        );
    }
}
