/// Closed failure set for the handle manager and renderer. Callers at the
/// workspace boundary see these wrapped in `anyhow::Error`; internally they
/// are matched on to decide downgrade-to-legacy vs. hard failure.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("failed to open console {0} handle")]
    HandleOpenFailed(&'static str),
    #[error("GetConsoleMode failed for the {0} handle")]
    ModeQueryFailed(&'static str),
    #[error("SetConsoleMode failed for the {0} handle")]
    ModeSetFailed(&'static str),
    #[error("GetConsoleScreenBufferInfo failed")]
    BufferInfoFailed,
    #[error("SetConsoleScreenBufferSize or SetConsoleWindowInfo failed")]
    ResizeFailed,
    #[error("GetConsoleCursorInfo or SetConsoleCursorInfo failed")]
    CursorInfoFailed,
    #[error("write to the console output handle failed")]
    WriteFailed,
    #[error("SetConsoleTitleW failed")]
    TitleFailed,
}
