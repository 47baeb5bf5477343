//! Draws the station chart as an SVG document.
//!
//! Three series share one axis: the 3-hour prediction (solid, circles), the
//! 6-hour prediction (dashed, triangles, translucent) and the observed level
//! (solid, squares). Points are placed by row index so that gaps in the hourly
//! record do not stretch the chart; tick labels show the row timestamps.

use crate::chart::error::ChartError;
use crate::chart::window::{recent_window, y_bounds};
use crate::types::observation::Observation;
use chrono::NaiveDateTime;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

const PRED_3H_COLOR: RGBColor = RGBColor(31, 119, 180);
const PRED_6H_COLOR: RGBColor = RGBColor(255, 127, 14);
const ACTUAL_COLOR: RGBColor = RGBColor(44, 160, 44);
const MAX_X_LABELS: usize = 8;

/// Text drawn on the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartLabels {
    /// Appended to the station label in the caption.
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub pred_3h: String,
    pub pred_6h: String,
    pub actual: String,
}

impl Default for ChartLabels {
    fn default() -> Self {
        Self {
            title: "지점 수위 예측".to_string(),
            x_axis: "시간".to_string(),
            y_axis: "수위 (m)".to_string(),
            pred_3h: "예측 수위(3시간)".to_string(),
            pred_6h: "예측 수위(6시간)".to_string(),
            actual: "실제 수위".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    /// Number of most recent rows to plot.
    pub window: usize,
    pub width: u32,
    pub height: u32,
    pub labels: ChartLabels,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            window: 24,
            width: 900,
            height: 420,
            labels: ChartLabels::default(),
        }
    }
}

/// A rendered chart together with the data it shows.
#[derive(Debug, Clone)]
pub struct Chart {
    pub svg: String,
    /// Plotted rows, oldest first.
    pub points: Vec<Observation>,
    pub y_range: Range<f64>,
}

/// Renders the most recent `options.window` observations of one station.
///
/// Fails with [`ChartError::NoData`] when there is no level to plot at all.
pub fn render(
    observations: &[Observation],
    station_label: &str,
    options: &ChartOptions,
) -> Result<Chart, ChartError> {
    let points = recent_window(observations, options.window);
    let y_range = y_bounds(&points).ok_or_else(|| ChartError::NoData(station_label.to_string()))?;
    let caption = format!(
        "{} {}(최근 {}개)",
        station_label, options.labels.title, options.window
    );

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let x_range = -0.5..points.len() as f64 - 0.5;
        let mut chart = ChartBuilder::on(&root)
            .caption(&caption, ("sans-serif", 20).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range.clone())?;

        let timestamps: Vec<NaiveDateTime> = points.iter().map(|o| o.timestamp).collect();
        let tick_label = |x: &f64| index_label(&timestamps, *x);
        let y_label = |y: &f64| format!("{:.2}", y);
        chart
            .configure_mesh()
            .x_desc(&options.labels.x_axis)
            .y_desc(&options.labels.y_axis)
            .x_labels(points.len().clamp(1, MAX_X_LABELS))
            .x_label_formatter(&tick_label)
            .y_label_formatter(&y_label)
            .draw()?;

        let pred_3h_style = PRED_3H_COLOR.stroke_width(2);
        chart
            .draw_series(
                segments(&points, |o| o.pred_3h)
                    .into_iter()
                    .map(|seg| PathElement::new(seg, pred_3h_style)),
            )?
            .label(&options.labels.pred_3h)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], pred_3h_style));
        chart.draw_series(
            series(&points, |o| o.pred_3h).map(|p| Circle::new(p, 3, PRED_3H_COLOR.filled())),
        )?;

        let pred_6h_style = PRED_6H_COLOR.mix(0.5).stroke_width(2);
        chart
            .draw_series(
                segments(&points, |o| o.pred_6h)
                    .into_iter()
                    .flat_map(|seg| DashedLineSeries::new(seg, 6, 4, pred_6h_style)),
            )?
            .label(&options.labels.pred_6h)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], pred_6h_style));
        chart.draw_series(series(&points, |o| o.pred_6h).map(|p| {
            TriangleMarker::new(p, 4, PRED_6H_COLOR.mix(0.5).filled())
        }))?;

        let actual_style = ACTUAL_COLOR.stroke_width(2);
        chart
            .draw_series(
                segments(&points, |o| o.actual_level)
                    .into_iter()
                    .map(|seg| PathElement::new(seg, actual_style)),
            )?
            .label(&options.labels.actual)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], actual_style));
        chart.draw_series(series(&points, |o| o.actual_level).map(|p| {
            EmptyElement::at(p) + Rectangle::new([(-3, -3), (3, 3)], ACTUAL_COLOR.filled())
        }))?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
    }

    Ok(Chart {
        svg,
        points,
        y_range,
    })
}

fn index_label(timestamps: &[NaiveDateTime], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    timestamps
        .get(idx as usize)
        .map(|ts| ts.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Points of one series, skipping rows where it has no value.
fn series<'a>(
    points: &'a [Observation],
    value: impl Fn(&Observation) -> Option<f64> + 'a,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    points
        .iter()
        .enumerate()
        .filter_map(move |(i, o)| value(o).map(|v| (i as f64, v)))
}

/// Runs of consecutive present values; a missing value breaks the line.
fn segments(points: &[Observation], value: impl Fn(&Observation) -> Option<f64>) -> Vec<Vec<(f64, f64)>> {
    let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current = Vec::new();
    for (i, o) in points.iter().enumerate() {
        match value(o) {
            Some(v) => current.push((i as f64, v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}
