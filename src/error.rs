use crate::chart::error::ChartError;
use crate::config::ConfigError;
use crate::source::error::FetchError;
use crate::station_data::error::StationDataError;
use crate::types::station::SheetNameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    StationData(#[from] StationDataError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InvalidSheetName(#[from] SheetNameError),

    #[error("No station sheet named '{0}'")]
    UnknownStation(String),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl DashboardError {
    /// Whether the error concerns a single station rather than the whole page.
    pub fn is_station_level(&self) -> bool {
        matches!(
            self,
            DashboardError::StationData(_) | DashboardError::Chart(_)
        )
    }
}
