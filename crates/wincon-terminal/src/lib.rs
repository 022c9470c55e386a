//! The console's handle/mode manager and the dual-mode renderer: the two
//! components that actually touch the Win32 console API or emit VT
//! escapes.

pub mod cursor;
pub mod error;
pub mod handle;
pub mod render;
pub mod vt;

pub use cursor::{CursorPos, CursorStyle};
pub use error::TerminalError;
pub use handle::{HandleManager, OriginalState, Rect};
pub use render::{accumulate_run, RenderMode, Renderer, Run};
