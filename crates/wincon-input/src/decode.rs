//! Translates raw Win32 `INPUT_RECORD` fields into the typed [`Event`]s the
//! scanner posts onto the queue. Pure functions over plain integers so they
//! are testable without a real console.

use wincon_events::{Event, FocusEvent, KeyCode, KeyEvent, KeyModifiers, MouseButtons, MouseEvent, ResizeEvent};

const RIGHT_ALT_PRESSED: u32 = 0x0001;
const LEFT_ALT_PRESSED: u32 = 0x0002;
const RIGHT_CTRL_PRESSED: u32 = 0x0004;
const LEFT_CTRL_PRESSED: u32 = 0x0008;
const SHIFT_PRESSED: u32 = 0x0010;

const VK_TAB: u16 = 0x09;

/// Fold the control-key-state word into a [`KeyModifiers`], stripping
/// Ctrl+Alt together (AltGr) so layouts that emit a dead/composed character
/// via AltGr don't additionally report it as a ctrl-alt chord.
pub fn modifiers_from_control_key_state(state: u32) -> KeyModifiers {
    let ctrl = state & (LEFT_CTRL_PRESSED | RIGHT_CTRL_PRESSED) != 0;
    let alt = state & (LEFT_ALT_PRESSED | RIGHT_ALT_PRESSED) != 0;
    let shift = state & SHIFT_PRESSED != 0;

    let mut mods = KeyModifiers::empty();
    if ctrl && !alt {
        mods |= KeyModifiers::CTRL;
    }
    if alt && !ctrl {
        mods |= KeyModifiers::ALT;
    }
    if shift {
        mods |= KeyModifiers::SHIFT;
    }
    mods
}

fn map_virtual_key(vk: u16) -> Option<KeyCode> {
    match vk {
        0x08 => Some(KeyCode::Backspace),
        0x09 => Some(KeyCode::Tab),
        0x0D => Some(KeyCode::Enter),
        0x13 => Some(KeyCode::Pause),
        0x1B => Some(KeyCode::Escape),
        0x20 => Some(KeyCode::Space),
        0x21 => Some(KeyCode::PgUp),
        0x22 => Some(KeyCode::PgDn),
        0x23 => Some(KeyCode::End),
        0x24 => Some(KeyCode::Home),
        0x25 => Some(KeyCode::Left),
        0x26 => Some(KeyCode::Up),
        0x27 => Some(KeyCode::Right),
        0x28 => Some(KeyCode::Down),
        0x03 => Some(KeyCode::Cancel),
        0x0C => Some(KeyCode::Clear),
        0x2A => Some(KeyCode::Print),
        0x2D => Some(KeyCode::Insert),
        0x2E => Some(KeyCode::Delete),
        0x2F => Some(KeyCode::Help),
        0x70..=0x87 => Some(KeyCode::F((vk - 0x70 + 1) as u8)),
        _ => None,
    }
}

/// Decode one KEY_EVENT_RECORD into zero or more [`Event::Key`]s.
///
/// Key-up records and records with `repeat_count < 1` are dropped
/// outright. A non-zero `unicode_char` produces a synthesized rune key,
/// repeated `repeat_count` times, except for the shift-tab special case
/// which is reported as [`KeyCode::Backtab`] with no modifiers. A zero
/// `unicode_char` falls back to the fixed virtual-key mapping; unmapped
/// virtual keys are dropped.
pub fn decode_key_record(
    is_down: bool,
    repeat_count: i16,
    virtual_key: u16,
    unicode_char: u16,
    control_key_state: u32,
) -> Vec<Event> {
    if !is_down || repeat_count < 1 {
        return Vec::new();
    }
    let mods = modifiers_from_control_key_state(control_key_state);
    let count = repeat_count as usize;

    if unicode_char != 0 {
        if mods == KeyModifiers::SHIFT && unicode_char == VK_TAB {
            return vec![Event::Key(KeyEvent::new(KeyCode::Backtab, KeyModifiers::empty())); count];
        }
        let Some(ch) = char::from_u32(unicode_char as u32) else {
            return Vec::new();
        };
        return vec![Event::Key(KeyEvent::new(KeyCode::Rune(ch), mods)); count];
    }

    match map_virtual_key(virtual_key) {
        Some(code) => vec![Event::Key(KeyEvent::new(code, mods)); count],
        None => Vec::new(),
    }
}

const FROM_LEFT_1ST_BUTTON_PRESSED: u32 = 0x0001;
const RIGHTMOST_BUTTON_PRESSED: u32 = 0x0002;
const FROM_LEFT_2ND_BUTTON_PRESSED: u32 = 0x0004;
const FROM_LEFT_3RD_BUTTON_PRESSED: u32 = 0x0008;
const FROM_LEFT_4TH_BUTTON_PRESSED: u32 = 0x0010;
const FROM_LEFT_5TH_BUTTON_PRESSED: u32 = 0x0020;
const FROM_LEFT_6TH_BUTTON_PRESSED: u32 = 0x0040;
const FROM_LEFT_7TH_BUTTON_PRESSED: u32 = 0x0080;

const MOUSE_WHEELED: u32 = 0x0004;
const MOUSE_HWHEELED: u32 = 0x0008;
const WHEEL_DELTA_SIGN: u32 = 0x8000_0000;

/// Decode one MOUSE_EVENT_RECORD. Double-click is not special-cased; it
/// arrives as an ordinary button-press bit and is delivered as such.
pub fn decode_mouse_record(
    x: i32,
    y: i32,
    button_state: u32,
    control_key_state: u32,
    event_flags: u32,
) -> Event {
    let mut buttons = MouseButtons::empty();
    if button_state & FROM_LEFT_1ST_BUTTON_PRESSED != 0 {
        buttons |= MouseButtons::BUTTON1;
    }
    if button_state & RIGHTMOST_BUTTON_PRESSED != 0 {
        buttons |= MouseButtons::BUTTON2;
    }
    if button_state & FROM_LEFT_2ND_BUTTON_PRESSED != 0 {
        buttons |= MouseButtons::BUTTON3;
    }
    if button_state & FROM_LEFT_3RD_BUTTON_PRESSED != 0 {
        buttons |= MouseButtons::BUTTON4;
    }
    if button_state & FROM_LEFT_4TH_BUTTON_PRESSED != 0 {
        buttons |= MouseButtons::BUTTON5;
    }
    if button_state & FROM_LEFT_5TH_BUTTON_PRESSED != 0 {
        buttons |= MouseButtons::BUTTON6;
    }
    if button_state & FROM_LEFT_6TH_BUTTON_PRESSED != 0 {
        buttons |= MouseButtons::BUTTON7;
    }
    if button_state & FROM_LEFT_7TH_BUTTON_PRESSED != 0 {
        buttons |= MouseButtons::BUTTON8;
    }

    if event_flags & MOUSE_WHEELED != 0 {
        if button_state & WHEEL_DELTA_SIGN != 0 {
            buttons |= MouseButtons::WHEEL_DOWN;
        } else {
            buttons |= MouseButtons::WHEEL_UP;
        }
    } else if event_flags & MOUSE_HWHEELED != 0 {
        if button_state & WHEEL_DELTA_SIGN != 0 {
            buttons |= MouseButtons::WHEEL_LEFT;
        } else {
            buttons |= MouseButtons::WHEEL_RIGHT;
        }
    }

    Event::Mouse(MouseEvent {
        x,
        y,
        buttons,
        mods: modifiers_from_control_key_state(control_key_state),
    })
}

pub fn decode_resize_record(width: u16, height: u16) -> Event {
    Event::Resize(ResizeEvent {
        width: width as usize,
        height: height as usize,
    })
}

/// Focus events are only produced when the caller has focus reporting
/// enabled; the decoder itself just shapes the event, the scanner decides
/// whether to forward it.
pub fn decode_focus_record(focused: bool) -> Event {
    Event::Focus(FocusEvent { focused })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_up_is_dropped() {
        assert!(decode_key_record(false, 1, 0x41, 'a' as u16, 0).is_empty());
    }

    #[test]
    fn zero_repeat_is_dropped() {
        assert!(decode_key_record(true, 0, 0x41, 'a' as u16, 0).is_empty());
    }

    #[test]
    fn rune_repeats_n_times() {
        let events = decode_key_record(true, 3, 0x41, 'a' as u16, 0);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], Event::Key(KeyEvent::new(KeyCode::Rune('a'), KeyModifiers::empty())));
    }

    #[test]
    fn shift_tab_becomes_backtab_with_no_mods() {
        let events = decode_key_record(true, 1, 0x09, 0x09, SHIFT_PRESSED);
        assert_eq!(events, vec![Event::Key(KeyEvent::new(KeyCode::Backtab, KeyModifiers::empty()))]);
    }

    #[test]
    fn altgr_is_suppressed_on_rune_events() {
        let events = decode_key_record(true, 1, 0, 'e' as u16, LEFT_CTRL_PRESSED | RIGHT_ALT_PRESSED);
        assert_eq!(events, vec![Event::Key(KeyEvent::new(KeyCode::Rune('e'), KeyModifiers::empty()))]);
    }

    #[test]
    fn unmapped_virtual_key_with_zero_char_is_dropped() {
        assert!(decode_key_record(true, 1, 0xFE, 0, 0).is_empty());
    }

    #[test]
    fn mapped_virtual_key_emits_named_code() {
        let events = decode_key_record(true, 1, 0x26, 0, 0);
        assert_eq!(events, vec![Event::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::empty()))]);
    }

    #[test]
    fn function_keys_span_f1_to_f24() {
        assert_eq!(map_virtual_key(0x70), Some(KeyCode::F(1)));
        assert_eq!(map_virtual_key(0x87), Some(KeyCode::F(24)));
    }

    #[test]
    fn wheel_up_down_from_sign_bit() {
        let up = decode_mouse_record(0, 0, 0x0078_0000, 0, MOUSE_WHEELED);
        let down = decode_mouse_record(0, 0, WHEEL_DELTA_SIGN, 0, MOUSE_WHEELED);
        match up {
            Event::Mouse(m) => assert!(m.buttons.contains(MouseButtons::WHEEL_UP)),
            _ => panic!("expected mouse event"),
        }
        match down {
            Event::Mouse(m) => assert!(m.buttons.contains(MouseButtons::WHEEL_DOWN)),
            _ => panic!("expected mouse event"),
        }
    }

    #[test]
    fn horizontal_wheel_uses_left_right() {
        let right = decode_mouse_record(0, 0, 0, 0, MOUSE_HWHEELED);
        match right {
            Event::Mouse(m) => assert!(m.buttons.contains(MouseButtons::WHEEL_RIGHT)),
            _ => panic!("expected mouse event"),
        }
    }

    #[test]
    fn button_bits_map_in_order() {
        let ev = decode_mouse_record(
            1,
            2,
            FROM_LEFT_1ST_BUTTON_PRESSED | RIGHTMOST_BUTTON_PRESSED,
            0,
            0,
        );
        match ev {
            Event::Mouse(m) => {
                assert!(m.buttons.contains(MouseButtons::BUTTON1));
                assert!(m.buttons.contains(MouseButtons::BUTTON2));
            }
            _ => panic!("expected mouse event"),
        }
    }

    #[test]
    fn button_bits_6_7_8_map_correctly() {
        let ev = decode_mouse_record(
            0,
            0,
            FROM_LEFT_5TH_BUTTON_PRESSED | FROM_LEFT_6TH_BUTTON_PRESSED | FROM_LEFT_7TH_BUTTON_PRESSED,
            0,
            0,
        );
        match ev {
            Event::Mouse(m) => {
                assert!(m.buttons.contains(MouseButtons::BUTTON6));
                assert!(m.buttons.contains(MouseButtons::BUTTON7));
                assert!(m.buttons.contains(MouseButtons::BUTTON8));
                assert!(!m.buttons.contains(MouseButtons::BUTTON1));
            }
            _ => panic!("expected mouse event"),
        }
    }
}
