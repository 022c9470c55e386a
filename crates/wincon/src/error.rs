/// Misuse errors reported directly to the caller rather than downgraded or
/// swallowed (spec.md §7's "misuse" error kind).
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("engage called while the screen is already running")]
    AlreadyRunning,
    #[error("screen has not been engaged")]
    NotRunning,
}
