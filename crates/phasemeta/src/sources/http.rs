//! Support to fetch the records from an HTTP endpoint.

use std::time::Duration;

use anyhow::Context;
use futures::future::BoxFuture;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode, Url};

use crate::config::HttpSourceConfig;
use crate::error::FetchError;
use crate::records::RawMetadataRecord;

use super::MetadataSource;

/// The user agent sent with every request.
pub const USER_AGENT: &str = concat!("phasemeta/", env!("CARGO_PKG_VERSION"));

/// Fetches the records with a `GET` request to an endpoint serving a JSON array of records.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: Url,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpSource {
    /// Creates a source for `url` without extra headers.
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url,
            headers: HeaderMap::new(),
            timeout,
        }
    }

    pub fn from_config(config: &HttpSourceConfig) -> anyhow::Result<Self> {
        let url = Url::parse(&config.url)
            .with_context(|| format!("invalid metadata url `{}`", config.url))?;

        let mut source = Self::new(url, config.timeout);
        for (key, value) in &config.headers {
            if let (Ok(key), Ok(value)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                source.headers.insert(key, value);
            } else {
                tracing::warn!(header = key.as_str(), "Skipping invalid header");
            }
        }

        Ok(source)
    }

    async fn download(&self) -> Result<Vec<RawMetadataRecord>, FetchError> {
        tracing::debug!("Fetching phase metadata from `{}`", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|err| FetchError::DownloadError(err.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FetchError::PermissionDenied(status.to_string()));
            }
            _ if !status.is_success() => {
                return Err(FetchError::DownloadError(status.to_string()));
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::DownloadError(err.to_string()))?;

        Ok(serde_json::from_slice(&body)?)
    }
}

impl MetadataSource for HttpSource {
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<RawMetadataRecord>, FetchError>> {
        Box::pin(async move {
            tokio::time::timeout(self.timeout, self.download())
                .await
                .unwrap_or(Err(FetchError::Timeout(self.timeout)))
        })
    }
}
