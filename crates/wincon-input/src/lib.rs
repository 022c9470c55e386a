//! Record decoding and the cancellable scanner thread: together, component
//! E (input decoder) and component F (scanner & cancellation).

pub mod decode;
pub mod error;
pub mod scanner;

pub use error::InputError;
pub use scanner::{Scanner, EVENT_CHANNEL_DEPTH};
