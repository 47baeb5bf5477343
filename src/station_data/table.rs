use crate::station_data::error::StationDataError;
use crate::types::columns::{COL_ACTUAL_LEVEL, COL_PRED_3H, COL_PRED_6H, COL_TIMESTAMP};
use crate::types::observation::Observation;
use crate::types::station::StationSheet;
use chrono::{DateTime, Utc};
use log::warn;
use polars::prelude::*;

/// Retrieves a column by name from a DataFrame.
fn get_column<'a>(df: &'a DataFrame, col: &str) -> Result<&'a Column, StationDataError> {
    df.column(col)
        .map_err(|e| StationDataError::ColumnNotFound(col.to_string(), e))
}

fn get_opt_float(series: &Float64Chunked, idx: usize) -> Option<f64> {
    series.get(idx)
}

/// The normalized observations of one station, ordered by timestamp.
///
/// Wraps the data frame produced by the row transform (or reloaded from the
/// sheet cache). The frame always has the four logical columns.
#[derive(Debug, Clone)]
pub struct StationTable {
    pub station: StationSheet,
    pub frame: DataFrame,
}

impl StationTable {
    pub fn new(station: StationSheet, frame: DataFrame) -> Self {
        Self { station, frame }
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// All rows as [`Observation`]s, oldest first.
    ///
    /// Rows whose timestamp is null or out of range are dropped with a warning.
    pub fn observations(&self) -> Result<Vec<Observation>, StationDataError> {
        let timestamps = get_column(&self.frame, COL_TIMESTAMP)?
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .cast(&DataType::Int64)?;
        let timestamps = timestamps.i64()?;
        let actual = get_column(&self.frame, COL_ACTUAL_LEVEL)?.cast(&DataType::Float64)?;
        let pred_3h = get_column(&self.frame, COL_PRED_3H)?.cast(&DataType::Float64)?;
        let pred_6h = get_column(&self.frame, COL_PRED_6H)?.cast(&DataType::Float64)?;
        let (actual, pred_3h, pred_6h) = (actual.f64()?, pred_3h.f64()?, pred_6h.f64()?);

        let mut observations = Vec::with_capacity(self.frame.height());
        let mut dropped = 0usize;
        for idx in 0..self.frame.height() {
            let Some(timestamp) = timestamps
                .get(idx)
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|dt| dt.naive_utc())
            else {
                dropped += 1;
                continue;
            };
            observations.push(Observation {
                timestamp,
                actual_level: get_opt_float(actual, idx),
                pred_3h: get_opt_float(pred_3h, idx),
                pred_6h: get_opt_float(pred_6h, idx),
            });
        }
        if dropped > 0 {
            warn!(
                "Dropped {} rows without a timestamp for station {}",
                dropped, self.station
            );
        }
        Ok(observations)
    }

    /// The `limit` most recent rows, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<Observation>, StationDataError> {
        let mut observations = self.observations()?;
        observations.reverse();
        observations.truncate(limit);
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(hours: &[u32]) -> StationTable {
        let millis: Vec<i64> = hours
            .iter()
            .map(|h| {
                NaiveDate::from_ymd_opt(2025, 5, 16)
                    .unwrap()
                    .and_hms_opt(*h, 0, 0)
                    .unwrap()
                    .and_utc()
                    .timestamp_millis()
            })
            .collect();
        let levels: Vec<Option<f64>> = hours
            .iter()
            .map(|h| if *h == 0 { None } else { Some(*h as f64 / 10.0) })
            .collect();
        let frame = DataFrame::new(vec![
            Column::new(COL_TIMESTAMP.into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .unwrap(),
            Column::new(COL_ACTUAL_LEVEL.into(), levels.clone()),
            Column::new(COL_PRED_3H.into(), levels.clone()),
            Column::new(COL_PRED_6H.into(), levels),
        ])
        .unwrap();
        StationTable::new(StationSheet::parse("00123_Station").unwrap(), frame)
    }

    #[test]
    fn test_observations_keep_frame_order_and_nulls() -> Result<(), StationDataError> {
        let obs = table(&[0, 1, 2]).observations()?;
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].actual_level, None);
        assert_eq!(obs[2].pred_6h, Some(0.2));
        assert!(obs[0].timestamp < obs[1].timestamp);
        Ok(())
    }

    #[test]
    fn test_recent_is_newest_first_and_bounded() -> Result<(), StationDataError> {
        let t = table(&[1, 2, 3, 4, 5]);
        let recent = t.recent(3)?;
        let hours: Vec<f64> = recent.iter().filter_map(|o| o.actual_level).collect();
        assert_eq!(hours, [0.5, 0.4, 0.3]);

        assert_eq!(t.recent(100)?.len(), 5);
        Ok(())
    }
}
