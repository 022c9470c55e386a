//! The cell grid: a fixed-size matrix of [`Cell`]s with per-cell dirty
//! tracking, resized and written to by the renderer every frame.

use unicode_width::UnicodeWidthStr;
use wincon_style::Style;

/// A single screen cell: a primary rune plus any combining runes that stack
/// on top of it, the style it's painted with, its measured display width,
/// and a dirty flag the renderer clears once it has been drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub main: char,
    pub combining: Vec<char>,
    pub style: Style,
    pub width: u8,
    pub dirty: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            main: ' ',
            combining: Vec::new(),
            style: Style::default(),
            width: 1,
            dirty: true,
        }
    }
}

impl Cell {
    /// The code units a renderer should write for this cell: the primary
    /// rune followed by its combining marks.
    pub fn runes(&self) -> impl Iterator<Item = char> + '_ {
        std::iter::once(self.main).chain(self.combining.iter().copied())
    }

    /// A blank (space, no combining marks, width 1) cell painted with
    /// `style` instead of `Style::default()`, dirty. Used to fill cells with
    /// the screen's current default style (spec.md §6 `SetStyle`) rather
    /// than always reverting to the neutral style.
    fn blank(style: Style) -> Self {
        Cell {
            main: ' ',
            combining: Vec::new(),
            style,
            width: 1,
            dirty: true,
        }
    }
}

fn measure_width(main: char, combining: &[char]) -> u8 {
    let mut buf = String::with_capacity(1 + combining.len());
    buf.push(main);
    buf.extend(combining.iter());
    let w = buf.width();
    // Combining marks contribute 0 width by definition; a bare main rune
    // that itself measures 0 (e.g. a true combining character used alone)
    // is normalized up to 1 so every cell occupies at least one column.
    w.max(1).min(2) as u8
}

/// A `w`×`h` grid of [`Cell`]s addressed row-major, `(x, y)` with `x` the
/// column and `y` the row.
#[derive(Debug, Clone)]
pub struct CellBuffer {
    w: usize,
    h: usize,
    cells: Vec<Cell>,
}

impl CellBuffer {
    pub fn new(w: usize, h: usize) -> Self {
        CellBuffer {
            w,
            h,
            cells: vec![Cell::default(); w * h],
        }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.w && y < self.h {
            Some(y * self.w + x)
        } else {
            None
        }
    }

    /// Reallocate to `(w, h)`, preserving the overlapping region and
    /// marking every surviving and new cell dirty. New cells (outside the
    /// overlap with the previous size) are blanked with `Style::default()`;
    /// see [`CellBuffer::resize_with_style`] for filling them with a
    /// caller-chosen default style instead.
    pub fn resize(&mut self, w: usize, h: usize) {
        self.resize_with_style(w, h, Style::default());
    }

    /// As [`CellBuffer::resize`], but cells newly exposed by the resize
    /// (outside the overlap with the previous size) are blanked with
    /// `fill_style` rather than `Style::default()`. The overlapping region
    /// keeps whatever style its cells already had.
    pub fn resize_with_style(&mut self, w: usize, h: usize, fill_style: Style) {
        let mut next = vec![Cell::blank(fill_style); w * h];
        let copy_w = self.w.min(w);
        let copy_h = self.h.min(h);
        for y in 0..copy_h {
            for x in 0..copy_w {
                let mut cell = self.cells[y * self.w + x].clone();
                cell.dirty = true;
                next[y * w + x] = cell;
            }
        }
        self.w = w;
        self.h = h;
        self.cells = next;
    }

    /// Blank every cell to `style` and mark it dirty, forcing a full redraw
    /// under the new default style on the next `Show`/`Sync`. Used when
    /// engaging the screen and whenever `SetStyle` should visibly take
    /// effect immediately (spec.md §4.G: "Clear the screen, invalidate
    /// cells, do a full redraw").
    pub fn fill(&mut self, style: Style) {
        for cell in &mut self.cells {
            *cell = Cell::blank(style.clone());
        }
    }

    /// Store the rune/style tuple at `(x, y)`, recomputing its display
    /// width and dirtying the cell iff content or style actually changed.
    /// Out-of-range coordinates are a silent no-op.
    pub fn set_content(&mut self, x: usize, y: usize, main: char, combining: &[char], style: Style) {
        let Some(idx) = self.index(x, y) else { return };
        let width = measure_width(main, combining);
        let cell = &mut self.cells[idx];
        let changed = cell.main != main || cell.combining != combining || cell.style != style;
        if changed {
            cell.main = main;
            cell.combining = combining.to_vec();
            cell.style = style;
            cell.width = width;
            cell.dirty = true;
        }
    }

    /// Out-of-range access returns a zero-valued cell but never panics.
    pub fn get_content(&self, x: usize, y: usize) -> (char, &[char], Style, u8) {
        match self.index(x, y) {
            Some(idx) => {
                let cell = &self.cells[idx];
                (cell.main, cell.combining.as_slice(), cell.style.clone(), cell.width)
            }
            None => (' ', &[], Style::default(), 1),
        }
    }

    pub fn dirty(&self, x: usize, y: usize) -> bool {
        self.index(x, y).map(|idx| self.cells[idx].dirty).unwrap_or(false)
    }

    pub fn set_dirty(&mut self, x: usize, y: usize, flag: bool) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx].dirty = flag;
        }
    }

    /// Mark every cell in the buffer dirty, forcing a full redraw on the
    /// next `Show`/`Sync`.
    pub fn invalidate(&mut self) {
        for cell in &mut self.cells {
            cell.dirty = true;
        }
    }

    /// Direct cell access for the renderer's run-walking loop.
    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.index(x, y).map(|idx| &self.cells[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wincon_style::Color;

    #[test]
    fn new_buffer_is_fully_dirty() {
        let buf = CellBuffer::new(4, 3);
        assert!(buf.dirty(0, 0));
        assert!(buf.dirty(3, 2));
    }

    #[test]
    fn out_of_range_never_panics() {
        let buf = CellBuffer::new(2, 2);
        let (main, combining, style, width) = buf.get_content(100, 100);
        assert_eq!(main, ' ');
        assert!(combining.is_empty());
        assert_eq!(style, Style::default());
        assert_eq!(width, 1);
        assert!(!buf.dirty(100, 100));
    }

    #[test]
    fn out_of_range_set_is_a_no_op() {
        let mut buf = CellBuffer::new(2, 2);
        buf.set_content(50, 50, 'x', &[], Style::default());
        buf.set_dirty(50, 50, false);
    }

    #[test]
    fn set_content_dirties_only_on_change() {
        let mut buf = CellBuffer::new(2, 2);
        buf.set_dirty(0, 0, false);
        buf.set_content(0, 0, 'a', &[], Style::default());
        assert!(buf.dirty(0, 0));
        buf.set_dirty(0, 0, false);
        buf.set_content(0, 0, 'a', &[], Style::default());
        assert!(!buf.dirty(0, 0));
        buf.set_content(0, 0, 'a', &[], Style::default().with_fg(Color::Indexed(1)));
        assert!(buf.dirty(0, 0));
    }

    #[test]
    fn width_never_normalizes_to_zero() {
        let mut buf = CellBuffer::new(1, 1);
        buf.set_content(0, 0, '\u{0301}', &[], Style::default());
        let (_, _, _, width) = buf.get_content(0, 0);
        assert!(width >= 1);
    }

    #[test]
    fn wide_glyph_measures_two() {
        let mut buf = CellBuffer::new(2, 1);
        buf.set_content(0, 0, '\u{4e2d}', &[], Style::default());
        let (_, _, _, width) = buf.get_content(0, 0);
        assert_eq!(width, 2);
    }

    #[test]
    fn resize_preserves_overlap_and_dirties_all() {
        let mut buf = CellBuffer::new(2, 2);
        buf.set_content(0, 0, 'x', &[], Style::default());
        buf.set_dirty(0, 0, false);
        buf.resize(3, 3);
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.height(), 3);
        let (main, ..) = buf.get_content(0, 0);
        assert_eq!(main, 'x');
        assert!(buf.dirty(0, 0));
        assert!(buf.dirty(2, 2));
    }

    #[test]
    fn resize_with_style_blanks_new_cells_with_the_given_style() {
        let mut buf = CellBuffer::new(1, 1);
        let style = Style::default().with_fg(Color::Indexed(2));
        buf.resize_with_style(2, 2, style.clone());
        let (main, _, got_style, _) = buf.get_content(1, 1);
        assert_eq!(main, ' ');
        assert_eq!(got_style, style);
    }

    #[test]
    fn fill_blanks_every_cell_with_the_given_style() {
        let mut buf = CellBuffer::new(2, 2);
        buf.set_content(0, 0, 'x', &[], Style::default());
        let style = Style::default().with_fg(Color::Indexed(4));
        buf.fill(style.clone());
        for y in 0..2 {
            for x in 0..2 {
                let (main, _, got_style, _) = buf.get_content(x, y);
                assert_eq!(main, ' ');
                assert_eq!(got_style, style);
                assert!(buf.dirty(x, y));
            }
        }
    }

    #[test]
    fn invalidate_marks_everything_dirty() {
        let mut buf = CellBuffer::new(2, 2);
        for y in 0..2 {
            for x in 0..2 {
                buf.set_dirty(x, y, false);
            }
        }
        buf.invalidate();
        for y in 0..2 {
            for x in 0..2 {
                assert!(buf.dirty(x, y));
            }
        }
    }
}
