use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StationDataError {
    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read metadata for cache file '{0}'")]
    CacheMetadataRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to read metadata for source file '{0}'")]
    SourceMetadataRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to open workbook '{0}'")]
    WorkbookOpen(PathBuf, #[source] calamine::Error),

    #[error("Failed to read sheet '{sheet}' from workbook")]
    SheetRead {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("Sheet '{0}' has no header row")]
    EmptySheet(String),

    #[error("Missing required column '{column}' for station {station}")]
    MissingColumnError { station: String, column: String },

    // Errors during parquet writing (inside blocking task)
    #[error("I/O error writing parquet cache file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing parquet cache file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to scan parquet cache file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("Failed to delete cache '{0}'")]
    CacheDeletionError(PathBuf, #[source] std::io::Error),

    #[error("Required column '{0}' not found in DataFrame")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
