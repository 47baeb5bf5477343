//! The row transform: turns a raw station sheet into a normalized station table.

use crate::station_data::error::StationDataError;
use crate::types::columns::{SourceColumns, COL_TIMESTAMP, NORMALIZED_COLUMNS};
use crate::types::station::StationSheet;
use polars::prelude::*;

/// Rounds to two decimals, sending exact ties to the even neighbour
/// (`1.125 -> 1.12`, `2.375 -> 2.38`).
fn round_half_even(column: Column) -> PolarsResult<Option<Column>> {
    let rounded = column
        .f64()?
        .apply_values(|v| (v * 100.0).round_ties_even() / 100.0);
    Ok(Some(rounded.into_column()))
}

/// Selects the four station columns, renames them and rounds the levels.
///
/// The output has exactly the columns `timestamp, actual_level, pred_3h,
/// pred_6h`, in that order, sorted by timestamp. The actual-level column is
/// found by the station code; all three level columns are cast to `f64` and
/// rounded to two decimals, ties to even. Extra columns of `raw` are dropped.
///
/// # Errors
///
/// [`StationDataError::MissingColumnError`] when `raw` lacks any of the
/// required columns, e.g. when the station code does not appear as a header.
pub fn select_and_normalize(
    raw: &DataFrame,
    station: &StationSheet,
    columns: &SourceColumns,
) -> Result<DataFrame, StationDataError> {
    let required = columns.required_for(station.code());
    let present = raw.get_column_names();
    if let Some(missing) = required
        .iter()
        .find(|name| !present.iter().any(|c| c.as_str() == name.as_str()))
    {
        return Err(StationDataError::MissingColumnError {
            station: station.code().to_string(),
            column: missing.clone(),
        });
    }

    let exprs: Vec<Expr> = required
        .iter()
        .zip(NORMALIZED_COLUMNS)
        .map(|(source, logical)| {
            if logical == COL_TIMESTAMP {
                col(source.as_str())
                    .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
                    .alias(logical)
            } else {
                col(source.as_str())
                    .cast(DataType::Float64)
                    .map(round_half_even, GetOutput::same_type())
                    .alias(logical)
            }
        })
        .collect();

    let normalized = raw
        .clone()
        .lazy()
        .select(exprs)
        .sort([COL_TIMESTAMP], SortMultipleOptions::default())
        .collect()?;
    Ok(normalized)
}
