//! Legacy 16-color attribute words and VT/ANSI escape sequences, both derived
//! from the same logical [`Style`].
//!
//! A single process-wide lock guards the memoized RGB→palette-index cache
//! (spec.md §5: "a separate process-wide lock guards the memoized color→
//! palette lookup cache"); the key space is bounded by the number of
//! distinct colors an application actually uses; see `core-render`'s
//! `ahash`-backed line-hash cache in the teacher workspace for the same
//! "small, bounded, hot" memoization shape.

use crate::{AttrMask, Color, Style, UnderlineStyle, VGA16};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

fn palette_cache() -> &'static Mutex<HashMap<(u8, u8, u8), u8, ahash::RandomState>> {
    static CACHE: OnceLock<Mutex<HashMap<(u8, u8, u8), u8, ahash::RandomState>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::default()))
}

/// Number of distinct RGB triples memoized so far. Exposed for tests; not
/// part of the style translation contract.
pub fn palette_cache_len() -> usize {
    palette_cache().lock().expect("palette cache poisoned").len()
}

/// xterm 256-color palette expansion for indices 16..=255 (6x6x6 color cube
/// plus a 24-step grayscale ramp), used only to resolve a high palette index
/// down to an RGB triple before nearest-matching it against [`VGA16`].
fn xterm256_rgb(index: u8) -> (u8, u8, u8) {
    if index < 16 {
        return VGA16[index as usize];
    }
    if index >= 232 {
        let level = 8 + (index - 232) * 10;
        return (level, level, level);
    }
    let i = index - 16;
    let steps = [0u8, 95, 135, 175, 215, 255];
    let r = steps[(i / 36) as usize];
    let g = steps[((i / 6) % 6) as usize];
    let b = steps[(i % 6) as usize];
    (r, g, b)
}

fn nearest_vga16(rgb: (u8, u8, u8)) -> u8 {
    if let Some(hit) = palette_cache().lock().expect("palette cache poisoned").get(&rgb) {
        return *hit;
    }
    let (r, g, b) = (rgb.0 as i32, rgb.1 as i32, rgb.2 as i32);
    let mut best = 0u8;
    let mut best_dist = i32::MAX;
    for (idx, (vr, vg, vb)) in VGA16.iter().enumerate() {
        let dr = r - *vr as i32;
        let dg = g - *vg as i32;
        let db = b - *vb as i32;
        let dist = dr * dr + dg * dg + db * db;
        if dist < best_dist {
            best_dist = dist;
            best = idx as u8;
        }
    }
    palette_cache()
        .lock()
        .expect("palette cache poisoned")
        .insert(rgb, best);
    best
}

/// Resolve a `Color` to a 0..=15 legacy palette index, falling back to
/// `original_nibble` (the captured original console attribute's nibble) for
/// `Color::Default`/`Color::Reset`.
fn resolve_legacy_index(color: Color, original_nibble: u8) -> u8 {
    match color {
        Color::Default | Color::Reset => original_nibble & 0x0F,
        Color::Indexed(i) if i < 16 => i,
        Color::Indexed(i) => nearest_vga16(xterm256_rgb(i)),
        Color::Rgb(r, g, b) => nearest_vga16((r, g, b)),
    }
}

/// Map a [`Style`] onto a legacy 16-color attribute word.
///
/// Bit layout (spec.md §4.C): bits 0..3 = FG index, bits 4..7 = BG index,
/// bit 0x8 of the FG nibble toggled for bold(+)/dim(-), bit 0x8000 set
/// best-effort whenever any underline style is requested. Reverse swaps the
/// FG/BG nibbles *before* bold/dim intensify the (post-swap) foreground.
pub fn legacy_attribute(style: &Style, original_attr: u16) -> u16 {
    let original_nibble_fg = (original_attr & 0x0F) as u8;
    let original_nibble_bg = ((original_attr >> 4) & 0x0F) as u8;

    let mut fg = resolve_legacy_index(style.fg, original_nibble_fg);
    let mut bg = resolve_legacy_index(style.bg, original_nibble_bg);

    if style.attrs.contains(AttrMask::REVERSE) {
        std::mem::swap(&mut fg, &mut bg);
    }

    if style.attrs.contains(AttrMask::DIM) {
        fg &= !0x8;
    } else if style.attrs.contains(AttrMask::BOLD) {
        fg |= 0x8;
    }

    let mut word = (fg as u16 & 0x0F) | (((bg as u16) & 0x0F) << 4);
    if style.attrs.contains(AttrMask::UNDERLINE) {
        word |= 0x8000;
    }
    word
}

fn underline_color_escape(color: Color) -> Option<String> {
    match color {
        Color::Default => None,
        Color::Reset => Some("\x1b[59m".to_string()),
        Color::Indexed(i) => Some(format!("\x1b[58;5;{i}m")),
        Color::Rgb(r, g, b) => Some(format!("\x1b[58;2;{r};{g};{b}m")),
    }
}

fn underline_substyle_escape(style: UnderlineStyle) -> &'static str {
    match style {
        UnderlineStyle::None | UnderlineStyle::Solid => "",
        UnderlineStyle::Double => "\x1b[4:2m",
        UnderlineStyle::Curly => "\x1b[4:3m",
        UnderlineStyle::Dotted => "\x1b[4:4m",
        UnderlineStyle::Dashed => "\x1b[4:5m",
    }
}

fn fg_color_escape(color: Color) -> Option<String> {
    match color {
        Color::Default | Color::Reset => None,
        Color::Indexed(i) => Some(format!("\x1b[38;5;{i}m")),
        Color::Rgb(r, g, b) => Some(format!("\x1b[38;2;{r};{g};{b}m")),
    }
}

fn bg_color_escape(color: Color) -> Option<String> {
    match color {
        Color::Default | Color::Reset => None,
        Color::Indexed(i) => Some(format!("\x1b[48;5;{i}m")),
        Color::Rgb(r, g, b) => Some(format!("\x1b[48;2;{r};{g};{b}m")),
    }
}

/// Render a [`Style`] as a complete VT/ANSI escape sequence. Always emits
/// the whole sequence from an `ESC[0m` reset; the renderer never diffs
/// sub-attributes (spec.md §4.C).
pub fn vt_escape(style: &Style) -> String {
    let mut out = String::with_capacity(48);
    out.push_str("\x1b[0m");

    let bold = style.attrs.contains(AttrMask::BOLD) && !style.attrs.contains(AttrMask::DIM);
    if bold {
        out.push_str("\x1b[1m");
    }
    if style.attrs.contains(AttrMask::BLINK) {
        out.push_str("\x1b[5m");
    }

    if style.underline_style != UnderlineStyle::None {
        if let Some(esc) = underline_color_escape(style.underline_color) {
            out.push_str(&esc);
        }
        out.push_str("\x1b[4m");
        out.push_str(underline_substyle_escape(style.underline_style));
    }

    if style.attrs.contains(AttrMask::REVERSE) {
        out.push_str("\x1b[7m");
    }

    if let Some(esc) = fg_color_escape(style.fg) {
        out.push_str(&esc);
    }
    if let Some(esc) = bg_color_escape(style.bg) {
        out.push_str(&esc);
    }

    if !style.url.is_empty() {
        out.push_str(&format!("\x1b]8;{};{}\x1b\\", style.url_id, style.url));
    } else {
        out.push_str("\x1b]8;;\x1b\\");
    }

    out
}
