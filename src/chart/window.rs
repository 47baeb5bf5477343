//! Row windowing and y-axis bounds for the station chart.

use crate::types::observation::Observation;
use std::ops::Range;

/// Padding added below the lowest and above the highest level, in metres.
pub const Y_PADDING: f64 = 0.1;

/// Smallest y-axis span, in metres. Narrower ranges are widened around their midpoint.
pub const MIN_Y_SPAN: f64 = 0.5;

/// The `size` most recent observations in ascending time order.
///
/// Input order does not matter. With fewer than `size` rows, all are returned.
pub fn recent_window(observations: &[Observation], size: usize) -> Vec<Observation> {
    let mut sorted = observations.to_vec();
    sorted.sort_by_key(|o| o.timestamp);
    let skip = sorted.len().saturating_sub(size);
    sorted.split_off(skip)
}

/// Y-axis range covering every level of every series.
///
/// Returns `None` when no observation carries any level.
pub fn y_bounds(observations: &[Observation]) -> Option<Range<f64>> {
    let (min, max) = observations
        .iter()
        .flat_map(Observation::levels)
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

    let lower = min - Y_PADDING;
    let upper = max + Y_PADDING;
    if upper - lower < MIN_Y_SPAN {
        let mid = (lower + upper) / 2.0;
        return Some(mid - MIN_Y_SPAN / 2.0..mid + MIN_Y_SPAN / 2.0);
    }
    Some(lower..upper)
}
