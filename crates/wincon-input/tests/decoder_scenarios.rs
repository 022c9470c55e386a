//! Literal-I/O scenarios S5 and S6 from spec.md §8, run against the public
//! `decode` module.

use wincon_events::{Event, KeyCode, KeyEvent, KeyModifiers};
use wincon_input::decode::decode_key_record;

const SHIFT_PRESSED: u32 = 0x0010;
const LEFT_CTRL_PRESSED: u32 = 0x0008;
const RIGHT_ALT_PRESSED: u32 = 0x0001;

/// S5 — a key record with isDown=1, repeat=1, char=0x09 (tab), and
/// controlKeyState carrying only the shift bit decodes to exactly one
/// Backtab event with no modifiers.
#[test]
fn s5_shift_tab_decodes_to_backtab() {
    let events = decode_key_record(true, 1, 0x09, 0x09, SHIFT_PRESSED);
    assert_eq!(
        events,
        vec![Event::Key(KeyEvent::new(KeyCode::Backtab, KeyModifiers::empty()))]
    );
}

/// S6 — a key record carrying 'e' with both ctrl and alt asserted (AltGr)
/// decodes to a plain rune event with no modifiers at all.
#[test]
fn s6_altgr_rune_has_no_reported_modifiers() {
    let events = decode_key_record(true, 1, 0, 'e' as u16, LEFT_CTRL_PRESSED | RIGHT_ALT_PRESSED);
    assert_eq!(
        events,
        vec![Event::Key(KeyEvent::new(KeyCode::Rune('e'), KeyModifiers::empty()))]
    );
}

/// Invariant 5 — key-up records and zero-repeat records never post.
#[test]
fn invariant_key_up_and_zero_repeat_never_post() {
    assert!(decode_key_record(false, 1, 0x41, 'a' as u16, 0).is_empty());
    assert!(decode_key_record(true, 0, 0x41, 'a' as u16, 0).is_empty());
}

/// Invariant 7 — Ctrl+Alt together never survives as a modifier pair on any
/// posted key event, rune or named.
#[test]
fn invariant_ctrl_alt_never_both_reported() {
    let rune_events = decode_key_record(true, 1, 0, 'a' as u16, LEFT_CTRL_PRESSED | RIGHT_ALT_PRESSED);
    for event in &rune_events {
        if let Event::Key(k) = event {
            assert!(!(k.mods.contains(KeyModifiers::CTRL) && k.mods.contains(KeyModifiers::ALT)));
        }
    }

    let named_events = decode_key_record(true, 1, 0x26, 0, LEFT_CTRL_PRESSED | RIGHT_ALT_PRESSED);
    for event in &named_events {
        if let Event::Key(k) = event {
            assert!(!(k.mods.contains(KeyModifiers::CTRL) && k.mods.contains(KeyModifiers::ALT)));
        }
    }
}
