use thiserror::Error;

use crate::command::{CommandError, QueryError};

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EditorError {
    #[error("editor is not active")]
    Inactive,
    #[error("`{0}` is unavailable in source mode")]
    SourceMode(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("an image upload is already in flight")]
    UploadInFlight,
    #[error("no pending upload for ticket {0}")]
    UnknownUpload(u64),
    #[error("editor has been unmounted")]
    Unmounted,
    #[error("editor is busy with another operation")]
    Busy,
    #[error("command failed: {0}")]
    Command(#[from] CommandError),
    #[error("query failed: {0}")]
    Query(#[from] QueryError),
}
