//! The public `Screen` facade: owns the handle manager, renderer, cell
//! buffer, scanner and the lifecycle state machine that ties them
//! together. This is the only crate in the workspace applications are
//! meant to depend on directly.

pub mod error;

pub use error::ScreenError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};
use wincon_config::{negotiate, EnvKnobs, NegotiatedCapabilities};
use wincon_events::Event;
use wincon_input::{Scanner, EVENT_CHANNEL_DEPTH};
use wincon_style::{Color, Style};
use wincon_terminal::render::RenderMode;
use wincon_terminal::{cursor, vt, CursorPos, CursorStyle, HandleManager, Renderer};
use wincon_text::CellBuffer;

/// Above this many columns or rows, the host is assumed to be a modern
/// terminal emulator that rejects application-initiated resize; see
/// spec.md §9's open question on this threshold. Exposed so an embedder
/// can tune it without forking the crate.
pub const RESIZE_SUPPRESS_THRESHOLD: usize = 500;

const DEFAULT_COLS: usize = 80;
const DEFAULT_ROWS: usize = 24;

struct Inner {
    handles: Option<HandleManager>,
    renderer: Option<Renderer>,
    scanner: Option<Scanner>,
    buffer: CellBuffer,
    caps: NegotiatedCapabilities,
    cursor_pos: CursorPos,
    cursor_style: CursorStyle,
    cursor_color: Color,
    default_style: Style,
    title: String,
    mouse_enabled: bool,
    focus_enabled: bool,
    running: bool,
}

impl Inner {
    fn new() -> Self {
        Inner {
            handles: None,
            renderer: None,
            scanner: None,
            buffer: CellBuffer::new(DEFAULT_COLS, DEFAULT_ROWS),
            caps: NegotiatedCapabilities {
                vt_capable: false,
                truecolor: false,
                altscreen_enabled: true,
            },
            cursor_pos: CursorPos::HIDDEN,
            cursor_style: CursorStyle::default(),
            cursor_color: Color::Default,
            default_style: Style::default(),
            title: String::new(),
            mouse_enabled: false,
            focus_enabled: false,
            running: false,
        }
    }
}

/// The console screen driver. One instance per engaged console session.
pub struct Screen {
    inner: Mutex<Inner>,
    fini_done: AtomicBool,
    event_tx: mpsc::Sender<Event>,
    event_rx: Mutex<Option<mpsc::Receiver<Event>>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl Screen {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        let (stop_tx, stop_rx) = watch::channel(false);
        Screen {
            inner: Mutex::new(Inner::new()),
            fini_done: AtomicBool::new(false),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            stop_tx,
            stop_rx,
        }
    }

    // ---- Lifecycle (spec.md §4.G) ----------------------------------

    pub fn init(&self) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().expect("screen mutex poisoned");

        let handles = HandleManager::open()?;
        let knobs = EnvKnobs::from_process_env();

        #[cfg(windows)]
        {
            // Attempt VT activation, then reread to confirm the bit stuck;
            // if it didn't, fall back to the all-zero legacy output mode.
            let _ = handles.apply_output_mode(true);
            let stuck = handles.vt_mode_stuck();
            if !stuck {
                let _ = handles.apply_output_mode(false);
            }
            inner.caps = negotiate(knobs, stuck);
        }
        #[cfg(not(windows))]
        {
            inner.caps = negotiate(knobs, false);
        }

        #[cfg(windows)]
        if let Ok((w, h)) = handles.viewport() {
            if w > 0 && h > 0 {
                inner.buffer.resize_with_style(w, h, inner.default_style.clone());
            }
        }

        inner.renderer = Some(Renderer::new(if inner.caps.vt_capable {
            RenderMode::Vt
        } else {
            RenderMode::Legacy
        }));
        inner.handles = Some(handles);

        self.engage_locked(&mut inner)
    }

    fn render_mode(&self, inner: &Inner) -> RenderMode {
        if inner.caps.vt_capable {
            RenderMode::Vt
        } else {
            RenderMode::Legacy
        }
    }

    fn engage_locked(&self, inner: &mut Inner) -> anyhow::Result<()> {
        if inner.running {
            return Err(ScreenError::AlreadyRunning.into());
        }

        #[cfg(windows)]
        {
            let handles = inner.handles.as_ref().expect("engage requires open handles");
            handles.apply_input_mode(inner.mouse_enabled)?;

            let mode = self.render_mode(inner);
            if mode == RenderMode::Vt {
                let mut setup = String::new();
                setup.push_str(vt::SAVE_TITLE);
                if inner.caps.altscreen_enabled {
                    setup.push_str(vt::ENTER_ALTSCREEN);
                }
                setup.push_str(vt::AUTO_WRAP_OFF);
                if !inner.title.is_empty() {
                    setup.push_str(&vt::set_title(&inner.title));
                }
                let utf16: Vec<u16> = setup.encode_utf16().collect();
                wincon_terminal::handle::write_console(handles.output, &utf16)?;
            }

            let sender = self.event_tx.clone();
            let scanner = Scanner::spawn(handles.input, sender, inner.focus_enabled)?;
            inner.scanner = Some(scanner);
        }

        // "Clear the screen, invalidate cells, do a full redraw" (spec.md
        // §4.G): fill every cell with the current default style rather than
        // `Style::default()`, so `SetStyle` called before `Init`/`Resume`
        // actually shows up. `fill` already dirties everything it touches.
        inner.buffer.fill(inner.default_style.clone());
        self.hide_cursor_locked(inner)?;
        self.redraw_locked(inner)?;
        inner.running = true;
        Ok(())
    }

    fn disengage_locked(&self, inner: &mut Inner) -> anyhow::Result<()> {
        if let Some(mut scanner) = inner.scanner.take() {
            scanner.stop();
        }

        #[cfg(windows)]
        if let Some(handles) = inner.handles.as_ref() {
            let mode = self.render_mode(inner);
            if mode == RenderMode::Vt {
                let mut teardown = String::new();
                teardown.push_str("\x1b[0 q");
                teardown.push_str("\x1b]112\x07");
                teardown.push_str(vt::AUTO_WRAP_ON);
                if inner.caps.altscreen_enabled {
                    teardown.push_str(vt::RESTORE_TITLE);
                    teardown.push_str(vt::EXIT_ALTSCREEN);
                }
                let utf16: Vec<u16> = teardown.encode_utf16().collect();
                let _ = wincon_terminal::handle::write_console(handles.output, &utf16);
            } else {
                // The legacy output mode never has
                // ENABLE_VIRTUAL_TERMINAL_PROCESSING set, so WriteConsoleW
                // would print a VT escape's literal characters instead of
                // interpreting it. Clear and home the cursor through the
                // real Win32 fill APIs instead (spec.md §4.G: "Under
                // legacy: clear screen and home cursor").
                let _ = wincon_terminal::handle::clear_screen_legacy(
                    handles.output,
                    inner.buffer.width() as i16,
                    inner.buffer.height() as i16,
                    handles.original.attributes,
                );
            }
            handles.restore()?;
        }

        inner.running = false;
        Ok(())
    }

    pub fn fini(&self) -> anyhow::Result<()> {
        if self.fini_done.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self.stop_tx.send(true);
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        self.disengage_locked(&mut inner)
    }

    /// `Running → Suspended` is the only transition `Suspend` supports
    /// (spec.md §3's lifecycle diagram); calling it before `Init()` or while
    /// already suspended is misuse, reported as [`ScreenError::NotRunning`]
    /// rather than silently disengaging an already-disengaged screen.
    pub fn suspend(&self) -> anyhow::Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        if !inner.running {
            return Err(ScreenError::NotRunning.into());
        }
        self.disengage_locked(&mut inner)
    }

    pub fn resume(&self) -> anyhow::Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        self.engage_locked(&mut inner)
    }

    /// Whether `Fini` has already run; mutating methods become no-ops past
    /// this point (spec.md §3: "Calls made after `Fini()` are no-ops on
    /// mutating methods").
    fn is_finished(&self) -> bool {
        self.fini_done.load(Ordering::SeqCst)
    }

    // ---- Geometry & cursor (spec.md §4.H) ---------------------------

    pub fn size(&self) -> (usize, usize) {
        let inner = self.inner.lock().expect("screen mutex poisoned");
        (inner.buffer.width(), inner.buffer.height())
    }

    fn resize_locked(&self, inner: &mut Inner) -> anyhow::Result<()> {
        #[cfg(windows)]
        {
            let Some(handles) = inner.handles.as_ref() else { return Ok(()) };
            let (w, h) = handles.viewport()?;
            if (w, h) == (inner.buffer.width(), inner.buffer.height()) {
                return Ok(());
            }
            inner.buffer.resize_with_style(w, h, inner.default_style.clone());
            handles.resize_buffer_and_window(w as i16, h as i16)?;
            let _ = self
                .event_tx
                .try_send(Event::Resize(wincon_events::ResizeEvent { width: w, height: h }));
        }
        Ok(())
    }

    pub fn set_size(&self, w: usize, h: usize) -> anyhow::Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        #[cfg(windows)]
        {
            let Some(handles) = inner.handles.as_ref() else { return Ok(()) };
            if w > RESIZE_SUPPRESS_THRESHOLD || h > RESIZE_SUPPRESS_THRESHOLD {
                tracing::info!(target: "wincon.geometry", w, h, "SetSize suppressed: host looks like a modern terminal");
                return Ok(());
            }
            let (max_w, max_h) = handles.largest_window();
            let w = if max_w > 0 { w.min(max_w as usize) } else { w };
            let h = if max_h > 0 { h.min(max_h as usize) } else { h };
            handles.resize_buffer_and_window(w as i16, h as i16)?;
        }
        self.resize_locked(&mut inner)
    }

    /// Sets the style cells are blanked with on the next clear: at `engage`
    /// (`Init`/`Resume`) and for any cell newly exposed by a resize. Does
    /// not retroactively repaint cells already on screen.
    pub fn set_style(&self, style: Style) {
        if self.is_finished() {
            return;
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.default_style = style;
    }

    pub fn set_title(&self, title: impl Into<String>) -> anyhow::Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.title = title.into();
        #[cfg(windows)]
        if inner.running {
            if let Some(handles) = inner.handles.as_ref() {
                let mode = self.render_mode(&inner);
                if mode == RenderMode::Vt {
                    let escape = vt::set_title(&inner.title);
                    let utf16: Vec<u16> = escape.encode_utf16().collect();
                    wincon_terminal::handle::write_console(handles.output, &utf16)?;
                } else {
                    wincon_terminal::handle::set_title(&inner.title)?;
                }
            }
        }
        Ok(())
    }

    pub fn show_cursor(&self, x: i32, y: i32) {
        if self.is_finished() {
            return;
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.cursor_pos = CursorPos { x, y };
        let _ = self.apply_cursor_locked(&inner);
    }

    pub fn hide_cursor(&self) {
        if self.is_finished() {
            return;
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.cursor_pos = CursorPos::HIDDEN;
        let _ = self.apply_cursor_locked(&inner);
    }

    pub fn set_cursor(&self, style: CursorStyle, color: Color) {
        if self.is_finished() {
            return;
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.cursor_style = style;
        inner.cursor_color = color;
        let _ = self.apply_cursor_locked(&inner);
    }

    #[cfg(windows)]
    fn apply_cursor_locked(&self, inner: &Inner) -> anyhow::Result<()> {
        if !inner.running {
            return Ok(());
        }
        let Some(handles) = inner.handles.as_ref() else { return Ok(()) };
        let mode = self.render_mode(inner);
        cursor::do_cursor(handles.output, mode, inner.cursor_pos, inner.cursor_style, inner.cursor_color)?;
        Ok(())
    }

    #[cfg(not(windows))]
    fn apply_cursor_locked(&self, _inner: &Inner) -> anyhow::Result<()> {
        Ok(())
    }

    // ---- Mouse / focus / paste --------------------------------------

    pub fn enable_mouse(&self) -> anyhow::Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.mouse_enabled = true;
        #[cfg(windows)]
        if inner.running {
            if let Some(handles) = inner.handles.as_ref() {
                handles.apply_input_mode(true)?;
            }
        }
        Ok(())
    }

    pub fn disable_mouse(&self) -> anyhow::Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.mouse_enabled = false;
        #[cfg(windows)]
        if inner.running {
            if let Some(handles) = inner.handles.as_ref() {
                handles.apply_input_mode(false)?;
            }
        }
        Ok(())
    }

    pub fn has_mouse(&self) -> bool {
        true
    }

    pub fn enable_focus(&self) {
        if self.is_finished() {
            return;
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.focus_enabled = true;
        if let Some(scanner) = inner.scanner.as_ref() {
            scanner.focus_enabled.store(true, Ordering::Relaxed);
        }
    }

    pub fn disable_focus(&self) {
        if self.is_finished() {
            return;
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.focus_enabled = false;
        if let Some(scanner) = inner.scanner.as_ref() {
            scanner.focus_enabled.store(false, Ordering::Relaxed);
        }
    }

    /// Bracketed paste is not attempted on this platform (spec.md's
    /// Non-goals). Both calls are accepted and do nothing, so callers that
    /// toggle paste mode portably across platforms don't need a
    /// platform-conditional branch.
    pub fn enable_paste(&self) {}
    pub fn disable_paste(&self) {}

    // ---- Rendering (spec.md §4.D) ------------------------------------

    /// Hides the cursor ahead of a viewport reconciliation or redraw.
    /// Split out from `redraw_locked` so callers that also reconcile the
    /// viewport (`show`/`sync`) can hide the cursor *before* that
    /// reconciliation happens, not after (spec.md §4.D: "Both hide the
    /// cursor first, reconcile viewport size with the backing buffer...,
    /// draw, then restore the visible cursor").
    fn hide_cursor_locked(&self, inner: &mut Inner) -> anyhow::Result<()> {
        #[cfg(windows)]
        {
            let Some(handles) = inner.handles.as_ref() else { return Ok(()) };
            let Some(renderer) = inner.renderer.as_ref() else { return Ok(()) };
            cursor::do_cursor(handles.output, self.render_mode_from(renderer), CursorPos::HIDDEN, inner.cursor_style, inner.cursor_color)?;
        }
        Ok(())
    }

    fn redraw_locked(&self, inner: &mut Inner) -> anyhow::Result<()> {
        #[cfg(windows)]
        {
            let Some(handles) = inner.handles.as_ref() else { return Ok(()) };
            let Some(renderer) = inner.renderer.as_ref() else { return Ok(()) };
            renderer.draw(handles.output, &mut inner.buffer, handles.original.attributes)?;
            if !inner.cursor_pos.is_hidden() {
                cursor::do_cursor(
                    handles.output,
                    self.render_mode_from(renderer),
                    inner.cursor_pos,
                    inner.cursor_style,
                    inner.cursor_color,
                )?;
            }
        }
        Ok(())
    }

    #[cfg(windows)]
    fn render_mode_from(&self, renderer: &Renderer) -> RenderMode {
        renderer.mode
    }

    pub fn show(&self) -> anyhow::Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        self.hide_cursor_locked(&mut inner)?;
        self.resize_locked(&mut inner)?;
        self.redraw_locked(&mut inner)
    }

    pub fn sync(&self) -> anyhow::Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        self.hide_cursor_locked(&mut inner)?;
        inner.buffer.invalidate();
        self.resize_locked(&mut inner)?;
        self.redraw_locked(&mut inner)
    }

    pub fn set_content(&self, x: usize, y: usize, main: char, combining: &[char], style: Style) {
        if self.is_finished() {
            return;
        }
        let mut inner = self.inner.lock().expect("screen mutex poisoned");
        inner.buffer.set_content(x, y, main, combining, style);
    }

    pub fn get_content(&self, x: usize, y: usize) -> (char, Vec<char>, Style, u8) {
        let inner = self.inner.lock().expect("screen mutex poisoned");
        let (main, combining, style, width) = inner.buffer.get_content(x, y);
        (main, combining.to_vec(), style, width)
    }

    // ---- Trivia (spec.md §6) -----------------------------------------

    pub fn colors(&self) -> u32 {
        let inner = self.inner.lock().expect("screen mutex poisoned");
        if inner.caps.truecolor {
            1 << 24
        } else {
            16
        }
    }

    pub fn beep(&self) -> anyhow::Result<()> {
        let inner = self.inner.lock().expect("screen mutex poisoned");
        #[cfg(windows)]
        if let Some(handles) = inner.handles.as_ref() {
            wincon_terminal::handle::write_console(handles.output, &[0x0007])?;
        }
        let _ = inner;
        Ok(())
    }

    pub fn has_key(&self, _code: wincon_events::KeyCode) -> bool {
        true
    }

    pub fn can_display(&self, _rune: char, _fallback: bool) -> bool {
        true
    }

    pub fn character_set(&self) -> &'static str {
        "UTF-16LE"
    }

    // ---- Queues --------------------------------------------------------

    /// Takes ownership of the readable event channel. Callable once; a
    /// second call returns `None`.
    pub fn event_queue(&self) -> Option<mpsc::Receiver<Event>> {
        self.event_rx.lock().expect("screen mutex poisoned").take()
    }

    /// A shutdown-notification channel that flips to `true` once `Fini`
    /// has run.
    pub fn stop_queue(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }
}

impl Default for Screen {
    fn default() -> Self {
        Screen::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fini_is_idempotent_without_init() {
        let screen = Screen::new();
        assert!(screen.fini().is_ok());
        assert!(screen.fini().is_ok());
    }

    #[test]
    fn suspend_before_init_is_misuse() {
        let screen = Screen::new();
        let err = screen.suspend().expect_err("suspend before Init must fail");
        assert!(matches!(err.downcast_ref::<ScreenError>(), Some(ScreenError::NotRunning)));
    }

    #[test]
    fn mutating_methods_are_no_ops_after_fini() {
        let screen = Screen::new();
        screen.set_content(0, 0, 'x', &[], Style::default());
        assert!(screen.fini().is_ok());

        screen.set_content(1, 1, 'y', &[], Style::default());
        let (main, ..) = screen.get_content(1, 1);
        assert_eq!(main, ' ', "set_content after fini must be a no-op");

        assert!(screen.show().is_ok());
        assert!(screen.sync().is_ok());
        assert!(screen.set_size(10, 10).is_ok());
        assert!(screen.suspend().is_ok());
        assert!(screen.resume().is_ok());
    }

    #[test]
    fn event_queue_is_taken_once() {
        let screen = Screen::new();
        assert!(screen.event_queue().is_some());
        assert!(screen.event_queue().is_none());
    }

    #[test]
    fn default_colors_before_init_is_16() {
        let screen = Screen::new();
        assert_eq!(screen.colors(), 16);
    }

    #[test]
    fn character_set_is_utf16le() {
        let screen = Screen::new();
        assert_eq!(screen.character_set(), "UTF-16LE");
    }

    #[test]
    fn set_content_and_get_content_round_trip() {
        let screen = Screen::new();
        screen.set_content(0, 0, 'x', &[], Style::default());
        let (main, combining, _, width) = screen.get_content(0, 0);
        assert_eq!(main, 'x');
        assert!(combining.is_empty());
        assert_eq!(width, 1);
    }
}
