//! Event value types posted by the input decoder onto the consumer-facing
//! event queue.
//!
//! Narrow collaborator types (key/button/event shapes) this workspace is
//! distilled around assume already exist upstream of the driver, the same
//! way [`wincon_style::Style`] does; nothing else in this workspace defines
//! them, so they live here.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyModifiers: u8 {
        const CTRL  = 0b001;
        const ALT   = 0b010;
        const SHIFT = 0b100;
    }
}

/// A decoded key identity. `Rune` carries the literal character produced by
/// the key; the rest are the fixed named-key mapping the decoder falls back
/// to when the console reports `char == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Rune(char),
    Backtab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PgUp,
    PgDn,
    Insert,
    Delete,
    Escape,
    Tab,
    Pause,
    Print,
    Help,
    Cancel,
    Clear,
    Backspace,
    Enter,
    Space,
    F(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode, mods: KeyModifiers) -> Self {
        KeyEvent { code, mods }
    }
}

bitflags::bitflags! {
    /// Which mouse buttons (and synthesized wheel pseudo-buttons) are
    /// asserted in a single [`MouseEvent`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u16 {
        const BUTTON1    = 1 << 0;
        const BUTTON2    = 1 << 1;
        const BUTTON3    = 1 << 2;
        const BUTTON4    = 1 << 3;
        const BUTTON5    = 1 << 4;
        const BUTTON6    = 1 << 5;
        const BUTTON7    = 1 << 6;
        const BUTTON8    = 1 << 7;
        const WHEEL_UP    = 1 << 8;
        const WHEEL_DOWN  = 1 << 9;
        const WHEEL_LEFT  = 1 << 10;
        const WHEEL_RIGHT = 1 << 11;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub x: i32,
    pub y: i32,
    pub buttons: MouseButtons,
    pub mods: KeyModifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResizeEvent {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FocusEvent {
    pub focused: bool,
}

/// Everything the scanner/input-decoder pair can post to the event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(ResizeEvent),
    Focus(FocusEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtab_carries_no_modifiers_by_construction_contract() {
        let ev = KeyEvent::new(KeyCode::Backtab, KeyModifiers::empty());
        assert_eq!(ev.mods, KeyModifiers::empty());
    }

    #[test]
    fn mouse_buttons_compose() {
        let b = MouseButtons::BUTTON1 | MouseButtons::WHEEL_UP;
        assert!(b.contains(MouseButtons::BUTTON1));
        assert!(b.contains(MouseButtons::WHEEL_UP));
        assert!(!b.contains(MouseButtons::WHEEL_DOWN));
    }
}
