use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("No observations to plot for station {0}")]
    NoData(String),

    #[error("Failed to draw chart: {0}")]
    Drawing(String),
}

impl<E> From<DrawingAreaErrorKind<E>> for ChartError
where
    E: std::error::Error + Send + Sync,
{
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Drawing(e.to_string())
    }
}
