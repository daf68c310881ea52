//! Authenticated, streamed object download.
//!
//! Objects are written to `<download_dir>/<final url segment>`. Each
//! request streams into its own hidden `.partial` file in the same
//! directory, renamed into place once complete, so a reader never sees a
//! truncated object under its final name. A later download of the same
//! name overwrites the earlier one. An abandoned or failed download leaves
//! no temp file behind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use metrics::counter;
use reqwest::{Client, Response};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, instrument};

use crate::error::{NotifyError, NotifyResult};

/// Header carrying the API key on download requests.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Write buffer size for streamed downloads.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Something that can fetch the object behind a notification URL.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Download `url`, returning the local path it was written to.
    async fn fetch(&self, url: &str) -> NotifyResult<PathBuf>;
}

/// Configuration for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Value sent in the `x-api-key` header
    pub api_key: String,
    /// Directory objects are written to (created on demand)
    pub download_dir: PathBuf,
    /// Write buffer size (10 MiB default)
    pub chunk_size: usize,
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl FetchConfig {
    pub fn new(api_key: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_key: api_key.into(),
            download_dir: download_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: Duration::from_secs(600), // 10 minutes
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Downloads objects over HTTP with an API key.
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| NotifyError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn download_dir(&self) -> &Path {
        &self.config.download_dir
    }

    /// Stream a response body into `file`, returning the byte count.
    async fn stream_to_file(&self, response: Response, file: File) -> NotifyResult<u64> {
        let mut writer = BufWriter::with_capacity(self.config.chunk_size, file);
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        writer.flush().await?;
        writer.into_inner().sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl ObjectFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> NotifyResult<PathBuf> {
        let filename = target_filename(url)?;

        // create_dir_all treats an existing directory as success
        fs::create_dir_all(&self.config.download_dir).await?;

        let final_path = self.config.download_dir.join(filename);

        info!(url = %url, path = %final_path.display(), "Beginning download");

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            counter!("object_download_failures_total").increment(1);
            return Err(NotifyError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // One temp file per request; removed on drop unless persisted
        let partial = tempfile::Builder::new()
            .prefix(&format!(".{}.", filename))
            .suffix(".partial")
            .tempfile_in(&self.config.download_dir)?;
        let file = File::from_std(partial.as_file().try_clone()?);

        let bytes = match self.stream_to_file(response, file).await {
            Ok(bytes) => bytes,
            Err(e) => {
                counter!("object_download_failures_total").increment(1);
                return Err(e);
            }
        };

        partial
            .persist(&final_path)
            .map_err(|e| NotifyError::from(e.error))?;

        counter!("object_downloads_total").increment(1);
        counter!("object_download_bytes_total").increment(bytes);

        info!(
            url = %url,
            path = %final_path.display(),
            bytes = bytes,
            "Completed download"
        );

        Ok(final_path)
    }
}

/// Local file name for an object URL: its final `/` segment, without any
/// query string or fragment.
pub fn target_filename(url: &str) -> NotifyResult<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);

    if name.is_empty() || name == "." || name == ".." {
        return Err(NotifyError::InvalidField {
            field: "url".to_string(),
            message: format!("no file name in {}", url),
        });
    }
    Ok(name)
}
