use thiserror::Error;

/// Failures that can abort an archival task.
///
/// Payload fetch failures never appear here: they are logged and recorded as
/// NULL payloads without aborting anything.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("authentication failed: {0}")]
    Auth(#[source] serenity::Error),

    #[error("remote api request failed: {0}")]
    Api(#[from] serenity::Error),

    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
