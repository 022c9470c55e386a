//! The dual-mode renderer: walks the cell buffer's dirty runs and emits
//! them through whichever path was negotiated at engage time.

use crate::error::TerminalError;
use wincon_style::{legacy_attribute, vt_escape, Style};
use wincon_text::CellBuffer;

#[cfg(windows)]
use crate::handle::{self, HANDLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Legacy,
    Vt,
}

/// One maximal span of contiguous same-style dirty cells in a row, ready to
/// flush: where it starts, the style shared by the whole span, the text to
/// write, which columns were consumed (so the caller can clear their dirty
/// bits after a successful flush), and `next_x`, the column the caller
/// should resume scanning from. `next_x` is not simply `columns.last() + 1`:
/// a wide cell consumes two screen columns but only ever appears once in
/// `columns` (its own starting column — the right-hand slot is never an
/// independent cell, spec.md §3), so `next_x` is the real cursor position
/// the accumulation loop stopped at.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub x: usize,
    pub style: Style,
    pub text: String,
    pub columns: Vec<usize>,
    pub next_x: usize,
}

/// Walk row `y` of `buffer` starting at `x`, accumulating one dirty run.
/// Returns `None` immediately if `x` is out of bounds or not dirty (the
/// caller advances past it). A wide glyph that would overflow the right
/// edge is substituted with a single space without rewriting the stored
/// cell (spec.md §4.B, §4.D, scenario S4). A wide glyph that fits within the
/// row consumes both of its screen columns before the run continues, so a
/// run ending right after one does not leave its elided right-hand slot to
/// be mistaken for the start of a new run (spec.md §3, §4.D). Pure and
/// platform-independent so it is unit-testable without a real console.
pub fn accumulate_run(buffer: &CellBuffer, x: usize, y: usize) -> Option<Run> {
    let w = buffer.width();
    if x >= w || !buffer.dirty(x, y) {
        return None;
    }
    let run_style = buffer.cell(x, y)?.style.clone();
    let start_x = x;
    let mut cursor = x;
    let mut text = String::new();
    let mut columns = Vec::new();
    while cursor < w {
        let Some(cell) = buffer.cell(cursor, y) else { break };
        if !cell.dirty || cell.style != run_style {
            break;
        }
        let width = cell.width as usize;
        if cursor + width > w {
            text.push(' ');
            columns.push(cursor);
            cursor += 1;
            continue;
        }
        text.extend(cell.runes());
        columns.push(cursor);
        cursor += width;
    }
    Some(Run {
        x: start_x,
        style: run_style,
        text,
        columns,
        next_x: cursor,
    })
}

/// Shared draw loop over [`CellBuffer`], dispatching the per-run flush to
/// whichever variant is active. Style is not diffed against the previous
/// run: every run emits its own position and style escape unconditionally,
/// even if identical to the run before it (spec.md §4.D, scenario S3).
pub struct Renderer {
    pub mode: RenderMode,
}

impl Renderer {
    pub fn new(mode: RenderMode) -> Self {
        Renderer { mode }
    }

    #[cfg(windows)]
    pub fn draw(
        &self,
        output: HANDLE,
        buffer: &mut CellBuffer,
        original_attr: u16,
    ) -> Result<(), TerminalError> {
        let h = buffer.height();
        let w = buffer.width();
        for y in 0..h {
            let mut x = 0usize;
            while x < w {
                let Some(run) = accumulate_run(buffer, x, y) else {
                    x += 1;
                    continue;
                };

                self.flush_run(output, run.x, y, &run.style, &run.text, original_attr)?;

                // Clear dirty across the whole `[x, next_x)` span, not just
                // `run.columns`: a wide cell's elided right-hand slot is
                // never its own entry in `columns` but was still visually
                // consumed by this run, and must not resurface as a new
                // run's start on the next draw pass.
                for cx in run.x..run.next_x {
                    buffer.set_dirty(cx, y, false);
                }
                x = run.next_x.max(x + 1);
            }
        }
        Ok(())
    }

    /// Position, style, and text are emitted once per run, unconditionally —
    /// spec.md §4.D doesn't diff a run's style against the previous run's, so
    /// neither do we (see S3: "three position-then-style-then-text bursts").
    #[cfg(windows)]
    fn flush_run(
        &self,
        output: HANDLE,
        x: usize,
        y: usize,
        style: &Style,
        text: &str,
        original_attr: u16,
    ) -> Result<(), TerminalError> {
        match self.mode {
            RenderMode::Legacy => {
                handle::set_cursor_position(output, x as i16, y as i16)?;
                let word = legacy_attribute(style, original_attr);
                handle::set_text_attribute(output, word)?;
                let utf16: Vec<u16> = text.encode_utf16().collect();
                handle::write_console(output, &utf16)?;
            }
            RenderMode::Vt => {
                let mut out = format!("\x1b[{};{}H", y + 1, x + 1);
                out.push_str(&vt_escape(style));
                out.push_str(text);
                let utf16: Vec<u16> = out.encode_utf16().collect();
                handle::write_console(output, &utf16)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wincon_style::Color;

    // The draw loop itself only touches real console handles on Windows;
    // `accumulate_run` is the platform-independent half and is exercised
    // directly here, matching spec.md §8's scenarios S2-S4.

    #[test]
    fn same_style_run_is_one_span() {
        let mut buf = CellBuffer::new(4, 1);
        let style = Style::default().with_fg(Color::Rgb(255, 0, 0));
        for x in 0..4 {
            buf.set_content(x, 0, 'A', &[], style.clone());
        }
        let run = accumulate_run(&buf, 0, 0).expect("expected a run");
        assert_eq!(run.x, 0);
        assert_eq!(run.style, style);
        assert_eq!(run.columns, vec![0, 1, 2, 3]);
        assert_eq!(run.text, "AAAA");
    }

    #[test]
    fn style_change_splits_runs() {
        let mut buf = CellBuffer::new(3, 1);
        let alpha = Style::default().with_fg(Color::Indexed(1));
        let beta = Style::default().with_fg(Color::Indexed(2));
        buf.set_content(0, 0, 'A', &[], alpha.clone());
        buf.set_content(1, 0, 'B', &[], beta.clone());
        buf.set_content(2, 0, 'C', &[], alpha.clone());

        let first = accumulate_run(&buf, 0, 0).expect("run at col 0");
        assert_eq!(first.columns, vec![0]);
        let second = accumulate_run(&buf, 1, 0).expect("run at col 1");
        assert_eq!(second.columns, vec![1]);
        let third = accumulate_run(&buf, 2, 0).expect("run at col 2");
        assert_eq!(third.columns, vec![2]);
    }

    #[test]
    fn non_dirty_cells_break_the_run() {
        let mut buf = CellBuffer::new(3, 1);
        buf.set_content(0, 0, 'A', &[], Style::default());
        buf.set_content(1, 0, 'B', &[], Style::default());
        buf.set_dirty(1, 0, false);
        buf.set_content(2, 0, 'C', &[], Style::default());

        let run = accumulate_run(&buf, 0, 0).expect("run at col 0");
        assert_eq!(run.columns, vec![0]);
        assert!(accumulate_run(&buf, 1, 0).is_none());
        let run2 = accumulate_run(&buf, 2, 0).expect("run at col 2");
        assert_eq!(run2.columns, vec![2]);
    }

    /// S4 — a wide glyph at the right edge renders as a single space, and
    /// the stored cell itself is not rewritten.
    #[test]
    fn wide_glyph_at_edge_becomes_a_single_space() {
        let mut buf = CellBuffer::new(4, 1);
        buf.set_content(0, 0, 'A', &[], Style::default());
        buf.set_content(1, 0, 'B', &[], Style::default());
        buf.set_content(2, 0, 'C', &[], Style::default());
        buf.set_content(3, 0, '\u{4e2d}', &[], Style::default()); // wide CJK glyph, width 2

        let run = accumulate_run(&buf, 0, 0).expect("run spans the row");
        assert_eq!(run.text, "ABC ");
        assert_eq!(run.columns, vec![0, 1, 2, 3]);
        assert_eq!(run.next_x, 4);

        let (stored_main, _, _, stored_width) = buf.get_content(3, 0);
        assert_eq!(stored_main, '\u{4e2d}');
        assert_eq!(stored_width, 2);
    }

    /// A wide glyph that does *not* sit at the row's right edge still
    /// consumes both of its screen columns, so `next_x` must skip past its
    /// elided right-hand slot rather than resuming one past the glyph's
    /// single entry in `columns`. Regression test for a bug where the
    /// renderer's draw loop used `columns.last() + 1` and re-entered that
    /// slot as a brand-new run, stomping on the glyph it had just written.
    #[test]
    fn wide_glyph_mid_row_advances_next_x_past_its_elided_slot() {
        let mut buf = CellBuffer::new(4, 1);
        let s = Style::default();
        let t = Style::default().with_fg(Color::Indexed(2));
        buf.set_content(0, 0, 'A', &[], s.clone());
        buf.set_content(1, 0, '\u{4e2d}', &[], s.clone()); // wide glyph, occupies cols 1-2
        buf.set_content(3, 0, 'Z', &[], t.clone());

        let run = accumulate_run(&buf, 0, 0).expect("run covering cols 0-1");
        assert_eq!(run.style, s);
        assert_eq!(run.text, "A\u{4e2d}");
        assert_eq!(run.columns, vec![0, 1]);
        assert_eq!(run.next_x, 3, "must skip the wide glyph's elided right-hand slot at col 2");

        // Column 2 is the glyph's elided slot: never written by `set_content`,
        // so still default-dirty, but it must not be treated as a run start.
        assert!(buf.dirty(2, 0));

        let next = accumulate_run(&buf, run.next_x, 0).expect("run at col 3");
        assert_eq!(next.x, 3);
        assert_eq!(next.style, t);
        assert_eq!(next.text, "Z");
    }
}
