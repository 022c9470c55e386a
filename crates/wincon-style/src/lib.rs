//! Style and color value types, plus the translator that maps a logical
//! [`Style`] onto the two physical representations the console driver can
//! emit: a legacy 16-color attribute word, or a VT/ANSI escape sequence.
//!
//! `Style` itself is treated as an external collaborator by the excerpt this
//! crate is distilled from (tcell's Windows console driver assumes it already
//! exists), but nothing upstream of this workspace defines it, so it lives
//! here.

pub mod translator;

pub use translator::{legacy_attribute, palette_cache_len, vt_escape};

bitflags::bitflags! {
    /// Attribute bits independent of color. `UNDERLINE` is the on/off bit;
    /// [`UnderlineStyle`] refines *which* underline when it is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttrMask: u8 {
        const BOLD      = 0b0000_0001;
        const DIM       = 0b0000_0010;
        const BLINK     = 0b0000_0100;
        const REVERSE   = 0b0000_1000;
        const UNDERLINE = 0b0001_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnderlineStyle {
    #[default]
    None,
    Solid,
    Double,
    Curly,
    Dotted,
    Dashed,
}

/// Either a low-16/256 palette index, a truecolor RGB triple, or one of the
/// two terminal-relative sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// Use whatever the terminal considers its default fg/bg.
    Default,
    /// Clear a previously applied override back to the terminal default.
    Reset,
    /// Palette index 0..=255. 0..=15 are the named VGA entries.
    Indexed(u8),
    /// 24-bit truecolor.
    Rgb(u8, u8, u8),
}

impl Default for Color {
    fn default() -> Self {
        Color::Default
    }
}

/// The 16 named low-palette VGA colors, in index order. Used both as the
/// legacy attribute nibble source and as the nearest-color search targets
/// for RGB/high-index colors the legacy path can't represent directly.
pub const VGA16: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00), // 0 black
    (0x80, 0x00, 0x00), // 1 maroon
    (0x00, 0x80, 0x00), // 2 green
    (0x80, 0x80, 0x00), // 3 olive
    (0x00, 0x00, 0x80), // 4 navy
    (0x80, 0x00, 0x80), // 5 purple
    (0x00, 0x80, 0x80), // 6 teal
    (0xC0, 0xC0, 0xC0), // 7 silver
    (0x80, 0x80, 0x80), // 8 grey
    (0xFF, 0x00, 0x00), // 9 red
    (0x00, 0xFF, 0x00), // 10 lime
    (0xFF, 0xFF, 0x00), // 11 yellow
    (0x00, 0x00, 0xFF), // 12 blue
    (0xFF, 0x00, 0xFF), // 13 fuchsia
    (0x00, 0xFF, 0xFF), // 14 aqua
    (0xFF, 0xFF, 0xFF), // 15 white
];

/// Immutable style aggregate: foreground/background color, attribute bits,
/// underline substyle/color, and an optional hyperlink.
///
/// `Style::default()` is the neutral sentinel (spec.md §3's `StyleDefault`):
/// both colors `Color::Default`, no attributes, no underline, no hyperlink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: AttrMask,
    pub underline_style: UnderlineStyle,
    pub underline_color: Color,
    pub url: String,
    pub url_id: String,
    /// Not part of the logical style; distinguishes [`Style::invalid`] from
    /// any style a caller could construct, so the renderer can use it to
    /// force a style transition on the very first cell of a frame without
    /// special-casing "no previous style" everywhere. Never compared against
    /// by anything outside this crate.
    invalid: bool,
}

impl Style {
    /// An internal sentinel unequal to every emittable style, including
    /// `Style::default()`. The renderer sets its "last applied style" to
    /// this before drawing the first run of a frame so the first style
    /// comparison always reports a change.
    pub fn invalid() -> Self {
        Style {
            invalid: true,
            ..Style::default()
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn with_fg(mut self, fg: Color) -> Self {
        self.fg = fg;
        self
    }

    pub fn with_bg(mut self, bg: Color) -> Self {
        self.bg = bg;
        self
    }

    pub fn with_attrs(mut self, attrs: AttrMask) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_underline(mut self, style: UnderlineStyle, color: Color) -> Self {
        self.underline_style = style;
        self.underline_color = color;
        if style != UnderlineStyle::None {
            self.attrs |= AttrMask::UNDERLINE;
        } else {
            self.attrs.remove(AttrMask::UNDERLINE);
        }
        self
    }

    pub fn with_url(mut self, url: impl Into<String>, id: impl Into<String>) -> Self {
        self.url = url.into();
        self.url_id = id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_is_neutral() {
        let s = Style::default();
        assert_eq!(s.fg, Color::Default);
        assert_eq!(s.bg, Color::Default);
        assert!(s.attrs.is_empty());
        assert_eq!(s.underline_style, UnderlineStyle::None);
        assert!(!s.is_invalid());
    }

    #[test]
    fn invalid_sentinel_differs_from_default() {
        assert_ne!(Style::invalid(), Style::default());
        assert!(Style::invalid().is_invalid());
    }

    #[test]
    fn builder_methods_compose() {
        let s = Style::default()
            .with_fg(Color::Indexed(9))
            .with_attrs(AttrMask::BOLD)
            .with_underline(UnderlineStyle::Curly, Color::Rgb(1, 2, 3));
        assert_eq!(s.fg, Color::Indexed(9));
        assert!(s.attrs.contains(AttrMask::BOLD | AttrMask::UNDERLINE));
        assert_eq!(s.underline_color, Color::Rgb(1, 2, 3));
    }
}
