use std::time::Duration;

use thiserror::Error;

/// An error that happens when fetching the phase metadata from its source.
///
/// The error is cloned to every caller that waits on the failing fetch, so all variants only
/// carry owned, clonable details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The metadata was not found at the source.
    #[error("not found")]
    NotFound,
    /// The source refused access to the metadata.
    ///
    /// The attached string contains the source's response.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The source did not answer in time.
    #[error("metadata fetch timed out after {0:?}")]
    Timeout(Duration),
    /// The metadata could not be fetched due to another problem, like connection loss, an io
    /// error, or a 5xx server response.
    #[error("fetch failed: {0}")]
    DownloadError(String),
    /// The metadata was fetched, but could not be decoded into records.
    #[error("malformed: {0}")]
    Malformed(String),
    /// The fetch task ended without producing a result.
    ///
    /// This is never produced by a source, only by the cell when the fetch task panicked or was
    /// dropped by the runtime.
    #[error("metadata fetch was interrupted")]
    Interrupted,
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::DownloadError(err.to_string()),
        }
    }
}
