#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("CreateEventW failed while creating the cancellation event")]
    CancelEventCreateFailed,
    #[error("WaitForMultipleObjects failed")]
    WaitFailed,
    #[error("ReadConsoleInputW failed")]
    ReadRecordFailed,
}
