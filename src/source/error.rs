use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download from {url} did not return an xlsx spreadsheet")]
    NotASpreadsheet { url: String },

    #[error("Download stream from {0} was interrupted")]
    DownloadIo(String, #[source] std::io::Error),

    #[error("Failed to create directory '{0}' for the downloaded file")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("I/O error writing downloaded file '{0}'")]
    FileWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to check for local copy '{0}'")]
    LocalCheck(PathBuf, #[source] std::io::Error),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            FetchError::NetworkRequest(_, e) => e.is_timeout() || e.is_connect() || e.is_body(),
            FetchError::HttpStatus { status, .. } => status.is_server_error(),
            FetchError::DownloadIo(..) => true,
            _ => false,
        }
    }
}
