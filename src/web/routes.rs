//! HTTP routes of the dashboard.

use crate::config::OverviewMode;
use crate::dashboard::Dashboard;
use crate::error::DashboardError;
use crate::types::observation::Observation;
use crate::types::station::StationSheet;
use crate::web::html::{render_page, MainPanel};
use crate::web::page::Page;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::services::ServeDir;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

#[derive(Debug, Serialize)]
struct StationRows {
    station: StationSheet,
    total_rows: usize,
    rows: Vec<Observation>,
}

/// A [`DashboardError`] returned from a JSON or image route.
struct ApiError(DashboardError);

fn is_missing_station(err: &DashboardError) -> bool {
    matches!(
        err,
        DashboardError::UnknownStation(_) | DashboardError::InvalidSheetName(_)
    )
}

fn status_for(err: &DashboardError) -> StatusCode {
    match err {
        e if is_missing_station(e) => StatusCode::NOT_FOUND,
        e if e.is_station_level() => StatusCode::UNPROCESSABLE_ENTITY,
        DashboardError::Fetch(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

pub fn router(dashboard: Arc<Dashboard>) -> Router {
    let static_files = ServeDir::new(&dashboard.config().static_dir);
    Router::new()
        .route("/", get(index))
        .route("/refresh", post(refresh))
        .route("/chart/:file", get(chart_svg))
        .route("/api/stations", get(list_stations))
        .route("/api/stations/:sheet", get(station_rows))
        .nest_service("/static", static_files)
        .with_state(dashboard)
}

async fn index(
    State(dashboard): State<Arc<Dashboard>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = Page::from_query(query.page.as_deref());
    render(&dashboard, &page, None).await
}

/// Builds the page for `page`. `page_error` replaces the main panel with an error.
async fn render(dashboard: &Dashboard, page: &Page, page_error: Option<DashboardError>) -> Response {
    let config = dashboard.config();

    let catalog = match dashboard.catalog().await {
        Ok(catalog) => catalog,
        Err(e) => {
            let status = status_for(&e);
            error!("Failed to load stations: {}", e);
            let html = render_page(config, &[], page, &MainPanel::PageError(e.to_string()));
            return (status, Html(html)).into_response();
        }
    };
    let stations = catalog.stations();

    if let Some(e) = page_error {
        let html = render_page(config, stations, page, &MainPanel::PageError(e.to_string()));
        return (status_for(&e), Html(html)).into_response();
    }

    match page {
        Page::Overview if config.overview_mode == OverviewMode::Splash => {
            Html(render_page(config, stations, page, &MainPanel::Splash)).into_response()
        }
        Page::Overview => match dashboard.overview().await {
            Ok(cells) => {
                Html(render_page(config, stations, page, &MainPanel::Grid(&cells))).into_response()
            }
            Err(e) => {
                let html = render_page(config, stations, page, &MainPanel::PageError(e.to_string()));
                (status_for(&e), Html(html)).into_response()
            }
        },
        Page::Station(sheet) => match dashboard.station_view(sheet).await {
            Ok(view) => {
                Html(render_page(config, stations, page, &MainPanel::Station(&view))).into_response()
            }
            Err(e) if e.is_station_level() || is_missing_station(&e) => {
                let panel = MainPanel::StationError {
                    station: sheet,
                    message: e.to_string(),
                };
                (status_for(&e), Html(render_page(config, stations, page, &panel))).into_response()
            }
            Err(e) => {
                let html = render_page(config, stations, page, &MainPanel::PageError(e.to_string()));
                (status_for(&e), Html(html)).into_response()
            }
        },
    }
}

async fn refresh(
    State(dashboard): State<Arc<Dashboard>>,
    Form(form): Form<PageQuery>,
) -> Response {
    let page = Page::from_query(form.page.as_deref());
    match dashboard.refresh().await {
        Ok(()) => Redirect::to(&page.href()).into_response(),
        Err(e) => {
            error!("Refresh failed: {}", e);
            render(&dashboard, &page, Some(e)).await
        }
    }
}

async fn chart_svg(
    State(dashboard): State<Arc<Dashboard>>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let Some(sheet) = file.strip_suffix(".svg").map(str::to_string) else {
        return Err(DashboardError::UnknownStation(file).into());
    };
    let view = dashboard.station_view(&sheet).await?;
    Ok((
        [(header::CONTENT_TYPE, "image/svg+xml")],
        view.chart.svg.clone(),
    )
        .into_response())
}

async fn list_stations(
    State(dashboard): State<Arc<Dashboard>>,
) -> Result<Json<Vec<StationSheet>>, ApiError> {
    let catalog = dashboard.catalog().await?;
    Ok(Json(catalog.stations().to_vec()))
}

async fn station_rows(
    State(dashboard): State<Arc<Dashboard>>,
    Path(sheet): Path<String>,
) -> Result<Json<StationRows>, ApiError> {
    let view = dashboard.station_view(&sheet).await?;
    Ok(Json(StationRows {
        station: view.station.clone(),
        total_rows: view.total_rows,
        rows: view.rows.clone(),
    }))
}
