//! Bit-exact VT/ANSI escape sequences used by the lifecycle state machine
//! for alternate-screen entry/exit, title save/restore, and auto-wrap
//! toggling. Kept separate from [`crate::render`] because these are
//! one-shot lifecycle transitions, not per-frame output.

pub const ENTER_ALTSCREEN: &str = "\x1b[?1049h\x1b[22;0;0t";
pub const EXIT_ALTSCREEN: &str = "\x1b[?1049l\x1b[23;0;0t";
pub const SAVE_TITLE: &str = "\x1b[22;2t";
pub const RESTORE_TITLE: &str = "\x1b[23;2t";
pub const AUTO_WRAP_ON: &str = "\x1b[?7h";
pub const AUTO_WRAP_OFF: &str = "\x1b[?7l";
pub const SHOW_CURSOR: &str = "\x1b[?25h";
pub const HIDE_CURSOR: &str = "\x1b[?25l";

pub fn set_title(title: &str) -> String {
    format!("\x1b]2;{title}\x1b\\")
}
