use std::io::Write;
use std::path::Path;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use tempfile::NamedTempFile;

/// User agent sent with every request unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("archiver/", env!("CARGO_PKG_VERSION"));

/// HTTP client settings shared by the content source and the asset fetcher.
///
/// Timeouts are off by default: a pass waits for every request to finish.
#[derive(Debug, Clone, Default)]
pub struct FetchSettings {
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl FetchSettings {
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent(
            self.user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        );
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

/// Retrieves a single binary resource into a local file.
#[async_trait::async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Downloads `source_url` into `destination`.
    ///
    /// Returns `true` if the file exists afterwards. An existing destination is
    /// left untouched without any network access. Failures are logged and
    /// reported as `false`; no partial file is ever left behind.
    async fn fetch(&self, source_url: &str, destination: &Path) -> bool;
}

#[derive(Debug, thiserror::Error)]
enum DownloadError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ReqwestAssetFetcher {
    client: reqwest::Client,
}

impl ReqwestAssetFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn download(&self, source_url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let url = reqwest::Url::parse(source_url)
            .map_err(|err| DownloadError::InvalidUrl(err.to_string()))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus(status.as_u16()));
        }

        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Stream into a sibling temp file; it is deleted on drop unless persisted.
        let mut tmp = NamedTempFile::new_in(dir)?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            tmp.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        tmp.flush()?;
        tmp.persist(destination).map_err(|err| DownloadError::Io(err.error))?;
        Ok(written)
    }
}

#[async_trait::async_trait]
impl AssetFetcher for ReqwestAssetFetcher {
    async fn fetch(&self, source_url: &str, destination: &Path) -> bool {
        if destination.exists() {
            engine_debug!("Asset {:?} already exists, skipping", destination);
            return true;
        }

        match self.download(source_url, destination).await {
            Ok(bytes) => {
                engine_debug!("Downloaded {} ({} bytes) to {:?}", source_url, bytes, destination);
                true
            }
            Err(err) => {
                engine_warn!("Could not download {}: {}", source_url, err);
                false
            }
        }
    }
}
