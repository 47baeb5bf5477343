//! The main entry point: ties the source fetcher, the station table caches and
//! the chart renderer together behind the operations the pages need.

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::ttl_cache::TtlCache;
use crate::chart::renderer::{render, Chart};
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::source::fetcher::SourceFetcher;
use crate::station_data::table::StationTable;
use crate::station_data::table_fetcher::TableFetcher;
use crate::station_data::workbook;
use crate::types::observation::Observation;
use crate::types::station::{StationCatalog, StationSheet};
use bon::bon;
use futures_util::future::join_all;
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task;

/// Everything shown on a station detail page.
#[derive(Debug, Clone, Serialize)]
pub struct StationView {
    pub station: StationSheet,
    /// The most recent rows, newest first.
    pub rows: Vec<Observation>,
    /// Row count of the full station table.
    pub total_rows: usize,
    #[serde(skip)]
    pub chart: Chart,
}

/// The outcome of building one station's view for the overview grid.
pub struct OverviewCell {
    pub station: StationSheet,
    pub view: Result<Arc<StationView>, DashboardError>,
}

/// The water-level dashboard.
///
/// Holds three layers of cached state:
///
/// * the local copy of the source workbook, downloaded once and then reused,
/// * station tables, cached on disk per sheet and in memory for
///   [`DashboardConfig::frame_ttl_secs`],
/// * rendered station views (table rows plus chart), held until [`Dashboard::refresh`].
///
/// All methods take `&self`; the dashboard is meant to be shared behind an `Arc`.
///
/// # Examples
///
/// ```no_run
/// # use waterlevel_dashboard::{Dashboard, DashboardConfig, DashboardError};
/// # async fn run() -> Result<(), DashboardError> {
/// let dashboard = Dashboard::builder()
///     .config(DashboardConfig::builder().cache_dir("/tmp/wl-cache").build())
///     .build()?;
///
/// for station in dashboard.catalog().await?.stations() {
///     let view = dashboard.station_view(station.name()).await?;
///     println!("{}: {} rows", station, view.total_rows);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Dashboard {
    config: DashboardConfig,
    source_fetcher: SourceFetcher,
    table_fetcher: TableFetcher,
    view_cache: TtlCache<String, Arc<StationView>>,
    catalog: Mutex<Option<Arc<StationCatalog>>>,
}

#[bon]
impl Dashboard {
    /// Creates a dashboard.
    ///
    /// # Arguments
    ///
    /// * `.config(DashboardConfig)`: Optional. Defaults to [`DashboardConfig::default`].
    /// * `.clock(Arc<dyn Clock>)`: Optional. Time source for the station table cache.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Config`] for invalid settings and
    /// [`DashboardError::Fetch`] if the HTTP client cannot be built.
    #[builder]
    pub fn new(
        #[builder(default)] config: DashboardConfig,
        #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)] clock: Arc<dyn Clock>,
    ) -> Result<Self, DashboardError> {
        config.validate()?;
        let source_fetcher = SourceFetcher::builder()
            .base_url(config.base_url.clone())
            .timeout(config.download_timeout())
            .max_retries(config.download_retries)
            .build()?;
        let table_fetcher = TableFetcher::new(
            &config.cache_dir,
            config.source_columns.clone(),
            config.frame_ttl(),
            clock,
        );
        Ok(Self {
            config,
            source_fetcher,
            table_fetcher,
            view_cache: TtlCache::without_expiry(),
            catalog: Mutex::new(None),
        })
    }
}

impl Dashboard {
    pub fn from_config(config: DashboardConfig) -> Result<Self, DashboardError> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Makes sure the source workbook exists locally, downloading it if missing.
    pub async fn ensure_source(&self) -> Result<PathBuf, DashboardError> {
        Ok(self
            .source_fetcher
            .ensure_local_copy(&self.config.remote_id, &self.config.source_path)
            .await?)
    }

    /// The stations of the source workbook, in tab order.
    ///
    /// Sheets whose name does not follow `<code>_<description>` are left out
    /// and logged.
    pub async fn catalog(&self) -> Result<Arc<StationCatalog>, DashboardError> {
        let mut guard = self.catalog.lock().await;
        if let Some(catalog) = guard.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let source = self.ensure_source().await?;
        let names = task::spawn_blocking(move || workbook::sheet_names(&source)).await??;
        let catalog = StationCatalog::from_sheet_names(names);
        for (name, reason) in catalog.rejected() {
            warn!("Ignoring sheet '{}': {}", name, reason);
        }
        info!("Found {} station sheets", catalog.stations().len());

        let catalog = Arc::new(catalog);
        *guard = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Looks up a station by sheet name.
    ///
    /// # Errors
    ///
    /// [`DashboardError::InvalidSheetName`] for sheets that exist but do not
    /// name a station, [`DashboardError::UnknownStation`] for names not in the
    /// workbook.
    pub async fn station(&self, sheet_name: &str) -> Result<StationSheet, DashboardError> {
        match self.catalog().await?.find(sheet_name)? {
            Some(station) => Ok(station.clone()),
            None => Err(DashboardError::UnknownStation(sheet_name.to_string())),
        }
    }

    /// The full table of one station.
    pub async fn station_table(&self, sheet_name: &str) -> Result<Arc<StationTable>, DashboardError> {
        let station = self.station(sheet_name).await?;
        self.load_table(&station).await
    }

    /// Table rows and chart for one station, built once and then served from memory.
    pub async fn station_view(&self, sheet_name: &str) -> Result<Arc<StationView>, DashboardError> {
        let station = self.station(sheet_name).await?;
        self.view_cache
            .get_or_try_compute(station.name().to_string(), || self.build_view(&station))
            .await
    }

    /// Views for every station, for the overview grid.
    ///
    /// A station that fails carries its own error; only a failure to list the
    /// stations fails the whole call.
    pub async fn overview(&self) -> Result<Vec<OverviewCell>, DashboardError> {
        let catalog = self.catalog().await?;
        let views = join_all(
            catalog
                .stations()
                .iter()
                .map(|station| self.station_view(station.name())),
        )
        .await;

        Ok(catalog
            .stations()
            .iter()
            .cloned()
            .zip(views)
            .map(|(station, view)| {
                if let Err(e) = &view {
                    warn!("Station {} unavailable: {}", station, e);
                }
                OverviewCell { station, view }
            })
            .collect())
    }

    /// Downloads the workbook again and drops every cache.
    ///
    /// Covers the local workbook copy, the on-disk sheet caches, the in-memory
    /// station tables, the rendered views and the station list. When the
    /// download fails nothing is cleared and the previous data stays available.
    pub async fn refresh(&self) -> Result<(), DashboardError> {
        info!("Refreshing dashboard data");
        self.source_fetcher
            .download(&self.config.remote_id, &self.config.source_path)
            .await?;
        self.table_fetcher.invalidate_all().await?;
        let views = self.view_cache.invalidate_all().await;
        *self.catalog.lock().await = None;
        info!("Refresh complete, dropped {} cached views", views);
        Ok(())
    }

    async fn load_table(&self, station: &StationSheet) -> Result<Arc<StationTable>, DashboardError> {
        let source = self.ensure_source().await?;
        Ok(self.table_fetcher.get_station_table(&source, station).await?)
    }

    async fn build_view(&self, station: &StationSheet) -> Result<Arc<StationView>, DashboardError> {
        let table = self.load_table(station).await?;
        let observations = table.observations()?;
        let rows = table.recent(self.config.table_rows)?;

        let options = self.config.chart_options();
        let label = station.name().to_string();
        let chart = task::spawn_blocking(move || render(&observations, &label, &options)).await??;

        Ok(Arc::new(StationView {
            station: station.clone(),
            rows,
            total_rows: table.len(),
            chart,
        }))
    }
}
