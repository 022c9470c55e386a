//! The long-lived scanner thread: blocks on the cancellation event and the
//! console input handle simultaneously, decodes whichever one signaled,
//! and posts events onto a bounded channel.

use crate::decode;
use crate::error::InputError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::Sender;
use wincon_events::Event;

/// Depth of the bounded channel the scanner posts onto (spec.md §4.F).
pub const EVENT_CHANNEL_DEPTH: usize = 10;

#[cfg(windows)]
mod sys {
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_FAILED, WAIT_OBJECT_0};
    use windows_sys::Win32::System::Console::{
        ReadConsoleInputW, FOCUS_EVENT, INPUT_RECORD, KEY_EVENT, MOUSE_EVENT,
        WINDOW_BUFFER_SIZE_EVENT,
    };
    use windows_sys::Win32::System::Threading::{
        CreateEventW, SetEvent, WaitForMultipleObjects, INFINITE,
    };

    pub fn create_cancel_event() -> Option<HANDLE> {
        // SAFETY: manual-reset (so a single SetEvent is observed by the one
        // waiter regardless of timing), initially unsignaled, unnamed.
        let handle = unsafe { CreateEventW(std::ptr::null(), 1, 0, std::ptr::null()) };
        if handle == 0 {
            None
        } else {
            Some(handle)
        }
    }

    pub fn signal(handle: HANDLE) {
        // SAFETY: `handle` is a valid event handle owned by the caller.
        unsafe {
            SetEvent(handle);
        }
    }

    pub fn close(handle: HANDLE) {
        // SAFETY: `handle` is a valid, still-open handle owned by the caller.
        unsafe {
            CloseHandle(handle);
        }
    }

    /// `Some(0)` when the cancellation event (lower index) fired, `Some(1)`
    /// when the input handle signaled, `None` on failure. The cancellation
    /// event wins on a simultaneous signal because it occupies index 0.
    pub fn wait_cancel_or_input(cancel: HANDLE, input: HANDLE) -> Option<u32> {
        let handles = [cancel, input];
        // SAFETY: `handles` is a valid 2-element array of open wait handles,
        // both outlive this call.
        let result = unsafe { WaitForMultipleObjects(2, handles.as_ptr(), 0, INFINITE) };
        if result == WAIT_FAILED {
            return None;
        }
        Some(result - WAIT_OBJECT_0)
    }

    pub fn read_one_record(input: HANDLE) -> Option<INPUT_RECORD> {
        let mut record: INPUT_RECORD = unsafe { std::mem::zeroed() };
        let mut read = 0u32;
        // SAFETY: `record` is a valid out-param sized for one record,
        // `input` is a console input handle.
        let ok = unsafe { ReadConsoleInputW(input, &mut record, 1, &mut read) };
        if ok == 0 || read == 0 {
            None
        } else {
            Some(record)
        }
    }

    pub fn decode_record(record: &INPUT_RECORD, focus_enabled: bool) -> Vec<super::Event> {
        // SAFETY: `EventType` tags which union member is initialized; each
        // arm only reads the member the tag promises is live.
        unsafe {
            match record.EventType as u32 {
                KEY_EVENT => {
                    let k = record.Event.KeyEvent;
                    super::decode::decode_key_record(
                        k.bKeyDown != 0,
                        k.wRepeatCount as i16,
                        k.wVirtualKeyCode,
                        k.uChar.UnicodeChar,
                        k.dwControlKeyState,
                    )
                }
                MOUSE_EVENT => {
                    let m = record.Event.MouseEvent;
                    vec![super::decode::decode_mouse_record(
                        m.dwMousePosition.X as i32,
                        m.dwMousePosition.Y as i32,
                        m.dwButtonState,
                        m.dwControlKeyState,
                        m.dwEventFlags,
                    )]
                }
                WINDOW_BUFFER_SIZE_EVENT => {
                    let r = record.Event.WindowBufferSizeEvent;
                    vec![super::decode::decode_resize_record(
                        r.dwSize.X as u16,
                        r.dwSize.Y as u16,
                    )]
                }
                FOCUS_EVENT => {
                    if focus_enabled {
                        let f = record.Event.FocusEvent;
                        vec![super::decode::decode_focus_record(f.bSetFocus != 0)]
                    } else {
                        Vec::new()
                    }
                }
                _ => Vec::new(),
            }
        }
    }
}

#[cfg(windows)]
use sys::HANDLE;
#[cfg(not(windows))]
type HANDLE = isize;

/// Owns the cancellation event and the scanner's OS thread for one engaged
/// session. `stop` is idempotent: signaling an already-signaled event and
/// joining an already-joined thread are both no-ops.
pub struct Scanner {
    #[cfg(windows)]
    cancel_event: HANDLE,
    join: Option<JoinHandle<()>>,
    pub focus_enabled: Arc<AtomicBool>,
    quit: Arc<AtomicBool>,
}

/// Send `event`, but give up and drop it the moment `quit` is raised instead
/// of blocking forever on a full channel. Returns `false` when the scanner
/// should stop reading entirely (teardown observed, or the receiver is gone).
fn post_or_drop(sender: &Sender<Event>, event: Event, quit: &AtomicBool) -> bool {
    use tokio::sync::mpsc::error::TrySendError;

    let mut event = event;
    loop {
        match sender.try_send(event) {
            Ok(()) => return true,
            Err(TrySendError::Closed(_)) => return false,
            Err(TrySendError::Full(ev)) => {
                if quit.load(Ordering::Relaxed) {
                    return false;
                }
                event = ev;
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        }
    }
}

impl Scanner {
    #[cfg(windows)]
    pub fn spawn(input: HANDLE, sender: Sender<Event>, focus_enabled: bool) -> Result<Self, InputError> {
        let cancel_event = sys::create_cancel_event().ok_or(InputError::CancelEventCreateFailed)?;
        let focus_flag = Arc::new(AtomicBool::new(focus_enabled));
        let thread_focus_flag = Arc::clone(&focus_flag);
        let quit_flag = Arc::new(AtomicBool::new(false));
        let thread_quit_flag = Arc::clone(&quit_flag);
        let thread_cancel = cancel_event;

        let join = std::thread::Builder::new()
            .name("wincon-scanner".into())
            .spawn(move || {
                loop {
                    match sys::wait_cancel_or_input(thread_cancel, input) {
                        Some(0) | None => break,
                        Some(_) => {
                            let Some(record) = sys::read_one_record(input) else {
                                tracing::warn!(target: "wincon.input", "ReadConsoleInputW failed, scanner terminating");
                                break;
                            };
                            let focus_on = thread_focus_flag.load(Ordering::Relaxed);
                            let mut quit = false;
                            for event in sys::decode_record(&record, focus_on) {
                                if !post_or_drop(&sender, event, &thread_quit_flag) {
                                    quit = true;
                                    break;
                                }
                            }
                            if quit {
                                break;
                            }
                        }
                    }
                    if thread_quit_flag.load(Ordering::Relaxed) {
                        break;
                    }
                }
            })
            .expect("failed to spawn scanner thread");

        Ok(Scanner {
            cancel_event,
            join: Some(join),
            focus_enabled: focus_flag,
            quit: quit_flag,
        })
    }

    /// Signal cancellation and block until the scanner thread has actually
    /// exited. Safe to call more than once.
    pub fn stop(&mut self) {
        self.quit.store(true, Ordering::Relaxed);
        #[cfg(windows)]
        {
            sys::signal(self.cancel_event);
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(windows)]
impl Drop for Scanner {
    fn drop(&mut self) {
        self.stop();
        sys::close(self.cancel_event);
    }
}

#[cfg(not(windows))]
impl Scanner {
    pub fn spawn(_input: HANDLE, _sender: Sender<Event>, focus_enabled: bool) -> Result<Self, InputError> {
        Ok(Scanner {
            join: None,
            focus_enabled: Arc::new(AtomicBool::new(focus_enabled)),
            quit: Arc::new(AtomicBool::new(false)),
        })
    }
}
