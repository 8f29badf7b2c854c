//! Sources of phase metadata.
//!
//! A [`MetadataSource`] is an opaque, possibly slow, possibly failing producer of the complete
//! record table. The [`LazyFetchCell`](crate::cell::LazyFetchCell) decides when it is called.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::records::RawMetadataRecord;

mod file;
mod http;

pub use file::FileSource;
pub use http::HttpSource;

/// Produces the complete, ordered sequence of phase metadata records.
pub trait MetadataSource: Send + Sync + 'static {
    /// Fetches all records.
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RawMetadataRecord>, FetchError>>;
}

impl<S: MetadataSource + ?Sized> MetadataSource for Arc<S> {
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RawMetadataRecord>, FetchError>> {
        (**self).fetch_all()
    }
}

/// A source created from a [`SourceConfig`].
#[derive(Debug)]
pub enum ConfiguredSource {
    File(FileSource),
    Http(HttpSource),
}

impl ConfiguredSource {
    pub fn from_config(config: &SourceConfig) -> anyhow::Result<Self> {
        Ok(match config {
            SourceConfig::File(config) => Self::File(FileSource::new(config.path.clone())),
            SourceConfig::Http(config) => Self::Http(HttpSource::from_config(config)?),
        })
    }
}

impl MetadataSource for ConfiguredSource {
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RawMetadataRecord>, FetchError>> {
        match self {
            Self::File(source) => source.fetch_all(),
            Self::Http(source) => source.fetch_all(),
        }
    }
}
