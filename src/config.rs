//! Dashboard configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. The file is TOML, read from `$DASHBOARD_CONFIG` or
//! `dashboard.toml` in the working directory.

use crate::chart::renderer::{ChartLabels, ChartOptions};
use crate::source::fetcher::DEFAULT_BASE_URL;
use crate::types::columns::{ColumnLabels, SourceColumns};
use crate::utils::default_cache_dir;
use bon::Builder;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "DASHBOARD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";
pub const DEFAULT_REMOTE_ID: &str = "16g4Btk17vNHSTPy-b40kxCESY38g0cD-";
pub const DEFAULT_SOURCE_FILE: &str = "All_Locations_Prediction.xlsx";
pub const DEFAULT_TITLE: &str = "한국수자원조사기술원 홍수위 예측";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_SPLASH_IMAGE: &str = "/static/mainpage.svg";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] io::Error),

    #[error("Invalid config file '{0}'")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// What the landing page shows when no station is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverviewMode {
    /// Introductory text and an optional image.
    Splash,
    /// Every station's chart in a two-column grid.
    #[default]
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct DashboardConfig {
    /// Drive id of the prediction workbook.
    #[builder(into, default = DEFAULT_REMOTE_ID.to_string())]
    pub remote_id: String,
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    /// Local copy of the workbook.
    #[builder(into, default = PathBuf::from(DEFAULT_SOURCE_FILE))]
    pub source_path: PathBuf,
    /// Directory holding the per-sheet Parquet files.
    #[builder(into, default = default_cache_dir())]
    pub cache_dir: PathBuf,
    #[builder(default)]
    pub source_columns: SourceColumns,
    #[builder(default)]
    pub column_labels: ColumnLabels,
    #[builder(default)]
    pub chart_labels: ChartLabels,
    /// Rows plotted in a station chart.
    #[builder(default = 24)]
    pub chart_window: usize,
    /// Rows listed in a station table.
    #[builder(default = 126)]
    pub table_rows: usize,
    #[builder(default = 3600)]
    pub frame_ttl_secs: u64,
    #[builder(default = 60)]
    pub download_timeout_secs: u64,
    #[builder(default = 2)]
    pub download_retries: u32,
    #[builder(default)]
    pub overview_mode: OverviewMode,
    #[builder(into, default = DEFAULT_TITLE.to_string())]
    pub title: String,
    /// Selector text of the overview entry.
    #[builder(into, default = "메인페이지".to_string())]
    pub overview_label: String,
    #[builder(default = default_sidebar_notes())]
    pub sidebar_notes: Vec<String>,
    #[builder(into, default = "A.I. 딥러닝 기반 3시간/6시간 수위 예측 결과입니다.".to_string())]
    pub splash_text: String,
    /// Image shown under the splash text. Empty for none.
    #[builder(into, default = DEFAULT_SPLASH_IMAGE.to_string())]
    pub splash_image_url: String,
    /// Directory served under `/static`.
    #[builder(into, default = PathBuf::from(DEFAULT_STATIC_DIR))]
    pub static_dir: PathBuf,
    #[builder(into, default = "예측 데이터는 실제 발생 수위와 차이가 있을 수 있습니다.".to_string())]
    pub disclaimer: String,
}

fn default_sidebar_notes() -> Vec<String> {
    [
        "개발자 : 영산강조사실 이성호",
        "문의 : 내선번호 937",
        "버전 : Ver 1.250516",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DashboardConfig {
    /// Loads the config from `$DASHBOARD_CONFIG`, or `dashboard.toml` when unset.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from_path(path)
    }

    /// Loads the config from `path`, using defaults when the file does not exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match fs::read_to_string(path) {
            Ok(contents) => {
                let config: DashboardConfig = toml::from_str(&contents)
                    .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
                info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config file at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => return Err(ConfigError::Read(path.to_path_buf(), e)),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chart_window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chart_window",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.table_rows == 0 {
            return Err(ConfigError::InvalidValue {
                field: "table_rows",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.remote_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "remote_id",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn frame_ttl(&self) -> Duration {
        Duration::from_secs(self.frame_ttl_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            window: self.chart_window,
            labels: self.chart_labels.clone(),
            ..ChartOptions::default()
        }
    }
}
