//! Literal-I/O scenarios from spec.md §8, exercised against the
//! platform-independent halves of the renderer (run accumulation, style
//! translation) that don't require a live console handle.

use wincon_style::{legacy_attribute, vt_escape, Color, Style};
use wincon_terminal::accumulate_run;
use wincon_text::CellBuffer;

/// S1 — plain draw, legacy path: a single red-on-default 'A' at (0,0)
/// accumulates into a one-glyph run, and the legacy attribute word carries
/// red (VGA16 index 9, already a named low-palette entry so it resolves
/// straight through) in its low nibble with the captured original
/// attribute's BG nibble untouched.
#[test]
fn s1_plain_draw_legacy_path() {
    let mut buf = CellBuffer::new(10, 1);
    let style = Style::default().with_fg(Color::Indexed(9));
    buf.set_content(0, 0, 'A', &[], style.clone());

    let run = accumulate_run(&buf, 0, 0).expect("dirty run at origin");
    assert_eq!(run.x, 0);
    assert_eq!(run.text, "A");

    let original_attr = 0x07; // fg=7 (silver), bg=0 (black)
    let word = legacy_attribute(&style, original_attr);
    assert_eq!(word & 0x0F, 9);
    assert_eq!((word >> 4) & 0x0F, 0);
}

/// S2 — VT coalescing: four same-style RGB-red cells in a row produce a
/// single run whose text is the concatenation of all four glyphs, and whose
/// VT escape sequence resets, sets the RGB foreground, and closes the
/// hyperlink form (no URL set).
#[test]
fn s2_vt_coalescing_single_run_single_style() {
    let mut buf = CellBuffer::new(4, 1);
    let style = Style::default().with_fg(Color::Rgb(255, 0, 0));
    for (i, ch) in "ABCD".chars().enumerate() {
        buf.set_content(i, 0, ch, &[], style.clone());
    }

    let run = accumulate_run(&buf, 0, 0).expect("one coalesced run");
    assert_eq!(run.text, "ABCD");
    assert_eq!(run.columns, vec![0, 1, 2, 3]);

    let escape = vt_escape(&style);
    assert_eq!(escape, "\x1b[0m\x1b[38;2;255;0;0m\x1b]8;;\x1b\\");
}

/// S3 — mixed styles: col 0 = 'A' style alpha, col 1 = 'B' style beta, col 2
/// = 'C' style alpha again. No coalescing across the style change, and no
/// coalescing between the two alpha cells either since they aren't adjacent
/// through beta.
#[test]
fn s3_mixed_styles_produce_three_runs() {
    let mut buf = CellBuffer::new(3, 1);
    let alpha = Style::default().with_fg(Color::Indexed(3));
    let beta = Style::default().with_fg(Color::Indexed(4));
    buf.set_content(0, 0, 'A', &[], alpha.clone());
    buf.set_content(1, 0, 'B', &[], beta.clone());
    buf.set_content(2, 0, 'C', &[], alpha.clone());

    let run_a = accumulate_run(&buf, 0, 0).unwrap();
    assert_eq!(run_a.columns, vec![0]);
    assert_eq!(run_a.style, alpha);

    let run_b = accumulate_run(&buf, 1, 0).unwrap();
    assert_eq!(run_b.columns, vec![1]);
    assert_eq!(run_b.style, beta);

    let run_c = accumulate_run(&buf, 2, 0).unwrap();
    assert_eq!(run_c.columns, vec![2]);
    assert_eq!(run_c.style, alpha);
}

/// S4 — a width-2 glyph placed at the last column of a 4-column buffer
/// renders as a single ASCII space instead of the wide glyph.
#[test]
fn s4_wide_glyph_at_right_edge_renders_as_space() {
    let mut buf = CellBuffer::new(4, 1);
    buf.set_content(0, 0, 'x', &[], Style::default());
    buf.set_content(1, 0, 'x', &[], Style::default());
    buf.set_content(2, 0, 'x', &[], Style::default());
    buf.set_content(3, 0, '\u{4e2d}', &[], Style::default());

    let run = accumulate_run(&buf, 0, 0).unwrap();
    assert_eq!(run.text.chars().last(), Some(' '));
    assert_ne!(run.text.chars().last(), Some('\u{4e2d}'));
}
