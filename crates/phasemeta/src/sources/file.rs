use std::path::PathBuf;

use futures::future::BoxFuture;

use crate::error::FetchError;
use crate::records::RawMetadataRecord;

use super::MetadataSource;

/// Reads the records from a local JSON file containing an array of records.
///
/// The file is read anew on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<Vec<RawMetadataRecord>, FetchError> {
        tracing::debug!("Reading phase metadata from `{}`", self.path.display());
        let contents = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&contents)?)
    }
}

impl MetadataSource for FileSource {
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RawMetadataRecord>, FetchError>> {
        Box::pin(self.read())
    }
}
