mod cache;
mod chart;
mod config;
mod dashboard;
mod error;
mod source;
mod station_data;
mod types;
mod utils;
mod web;

#[cfg(test)]
mod test_support;

pub use config::*;
pub use dashboard::*;
pub use error::DashboardError;

pub use cache::clock::{Clock, ManualClock, SystemClock};
pub use cache::ttl_cache::TtlCache;

pub use chart::error::ChartError;
pub use chart::renderer::{render, Chart, ChartLabels, ChartOptions};

pub use source::error::FetchError;
pub use source::fetcher::{SourceFetcher, DEFAULT_BASE_URL};

pub use station_data::error::StationDataError;
pub use station_data::table::StationTable;
pub use station_data::transform::select_and_normalize;

pub use types::columns::*;
pub use types::observation::Observation;
pub use types::station::*;

pub use web::page::Page;
pub use web::routes::router;
