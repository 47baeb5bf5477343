use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use waterlevel_dashboard::{router, Dashboard, DashboardConfig};

const DEFAULT_PORT: u16 = 8501;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DashboardConfig::load()?;
    let dashboard = Arc::new(Dashboard::from_config(config)?);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(dashboard)).await?;
    Ok(())
}
