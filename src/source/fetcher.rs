//! Retrieves the prediction spreadsheet from its public cloud-drive link.

use crate::source::error::FetchError;
use bon::bon;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

pub const DEFAULT_BASE_URL: &str = "https://drive.google.com";

/// Local file header signature; every xlsx is a zip archive.
const XLSX_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

/// Downloads a single file identified by an opaque drive id.
///
/// The transfer is skipped entirely when a local copy already exists; see
/// [`SourceFetcher::ensure_local_copy`]. Downloads stream into a temporary file
/// next to the destination and are renamed into place only once complete, so
/// an interrupted transfer never leaves a truncated spreadsheet behind.
pub struct SourceFetcher {
    client: Client,
    base_url: String,
    max_retries: u32,
    initial_backoff: Duration,
}

#[bon]
impl SourceFetcher {
    /// Creates a fetcher.
    ///
    /// # Arguments
    ///
    /// * `.base_url(..)`: Optional. Drive host, defaults to [`DEFAULT_BASE_URL`].
    /// * `.timeout(Duration)`: Optional. Per-request timeout, defaults to 60 s.
    /// * `.max_retries(u32)`: Optional. Extra attempts after a transient failure, defaults to 2.
    /// * `.initial_backoff(Duration)`: Optional. Delay before the first retry, doubled each time.
    #[builder]
    pub fn new(
        #[builder(into, default = DEFAULT_BASE_URL.to_string())] base_url: String,
        #[builder(default = Duration::from_secs(60))] timeout: Duration,
        #[builder(default = 2)] max_retries: u32,
        #[builder(default = Duration::from_millis(500))] initial_backoff: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("waterlevel_dashboard/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            initial_backoff,
        })
    }
}

impl SourceFetcher {
    pub fn download_url(&self, remote_id: &str) -> String {
        format!("{}/uc?export=download&id={}", self.base_url, remote_id)
    }

    /// Returns `local_path`, downloading the file first only if it does not exist.
    ///
    /// An existing file is never compared against the remote; fetching a newer
    /// version is done explicitly through [`SourceFetcher::download`].
    pub async fn ensure_local_copy(
        &self,
        remote_id: &str,
        local_path: &Path,
    ) -> Result<PathBuf, FetchError> {
        let exists = fs::try_exists(local_path)
            .await
            .map_err(|e| FetchError::LocalCheck(local_path.to_path_buf(), e))?;
        if exists {
            debug!("Local copy present at {:?}, skipping download", local_path);
            return Ok(local_path.to_path_buf());
        }

        warn!(
            "No local copy at {:?}. Downloading source file {}.",
            local_path, remote_id
        );
        self.download(remote_id, local_path).await
    }

    /// Downloads the file unconditionally, replacing any existing local copy.
    ///
    /// Timeouts, connection failures and 5xx responses are retried up to
    /// `max_retries` times with exponential backoff. Everything else fails on
    /// the first attempt.
    pub async fn download(&self, remote_id: &str, local_path: &Path) -> Result<PathBuf, FetchError> {
        let url = self.download_url(remote_id);
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match self.download_once(&url, local_path).await {
                Ok(bytes) => {
                    info!("Downloaded {} bytes from {} to {:?}", bytes, url, local_path);
                    return Ok(local_path.to_path_buf());
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Download attempt {} of {} failed: {}. Retrying in {:?}",
                        attempt, url, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn download_once(&self, url: &str, local_path: &Path) -> Result<u64, FetchError> {
        info!("Downloading data from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        // Drive answers with an HTML page for quota, permission and virus-scan interstitials.
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));
        if is_html {
            return Err(FetchError::NotASpreadsheet {
                url: url.to_string(),
            });
        }

        let dir = local_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir)
            .await
            .map_err(|e| FetchError::DirCreation(dir.to_path_buf(), e))?;

        let temp = NamedTempFile::new_in(dir).map_err(|e| FetchError::FileWrite(dir.to_path_buf(), e))?;
        let handle = temp
            .reopen()
            .map_err(|e| FetchError::FileWrite(temp.path().to_path_buf(), e))?;
        let mut file = fs::File::from_std(handle);

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| FetchError::DownloadIo(url.to_string(), e))?;
        file.flush()
            .await
            .map_err(|e| FetchError::FileWrite(temp.path().to_path_buf(), e))?;
        file.sync_all()
            .await
            .map_err(|e| FetchError::FileWrite(temp.path().to_path_buf(), e))?;
        drop(file);

        if !has_xlsx_signature(temp.path()).await? {
            warn!("Body from {} is not an xlsx archive", url);
            return Err(FetchError::NotASpreadsheet {
                url: url.to_string(),
            });
        }

        temp.persist(local_path)
            .map_err(|e| FetchError::FileWrite(local_path.to_path_buf(), e.error))?;
        Ok(written)
    }
}

async fn has_xlsx_signature(path: &Path) -> Result<bool, FetchError> {
    let mut file = fs::File::open(path)
        .await
        .map_err(|e| FetchError::FileWrite(path.to_path_buf(), e))?;
    let mut head = [0u8; 4];
    match file.read_exact(&mut head).await {
        Ok(_) => Ok(&head == XLSX_SIGNATURE),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(FetchError::FileWrite(path.to_path_buf(), e)),
    }
}
