//! Reads station sheets out of the source workbook into raw data frames.
//!
//! Only the requested headers are materialized. Column names of the returned
//! frame are the headers exactly as found in the sheet; renaming to logical
//! names is left to [`crate::station_data::transform`].

use crate::station_data::error::StationDataError;
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use chrono::NaiveDateTime;
use log::{debug, warn};
use polars::prelude::*;
use std::path::Path;

const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M",
];

/// Lists the sheet names of a workbook in tab order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, StationDataError> {
    let workbook = open_workbook_auto(path)
        .map_err(|e| StationDataError::WorkbookOpen(path.to_path_buf(), e))?;
    Ok(workbook.sheet_names())
}

/// Reads a timestamp column and a set of numeric columns from one sheet.
///
/// The first row of the sheet is the header. Rows with an empty timestamp
/// cell are ignored, as are rows whose timestamp cannot be interpreted.
/// Numeric cells that are empty or not numbers become nulls.
///
/// Returns [`StationDataError::MissingColumnError`] naming the first requested
/// header that is not present.
pub fn read_columns(
    path: &Path,
    sheet: &str,
    timestamp_header: &str,
    value_headers: &[&str],
) -> Result<DataFrame, StationDataError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| StationDataError::WorkbookOpen(path.to_path_buf(), e))?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| StationDataError::SheetRead {
            sheet: sheet.to_string(),
            source: e,
        })?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| StationDataError::EmptySheet(sheet.to_string()))?
        .iter()
        .map(header_text)
        .collect();

    let position = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| StationDataError::MissingColumnError {
                station: sheet.to_string(),
                column: name.to_string(),
            })
    };
    let ts_idx = position(timestamp_header)?;
    let value_idx = value_headers
        .iter()
        .map(|h| position(h))
        .collect::<Result<Vec<_>, _>>()?;

    let mut timestamps: Vec<i64> = Vec::with_capacity(range.height());
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(range.height()); value_idx.len()];
    let mut skipped = 0usize;

    for row in rows {
        let ts_cell = row.get(ts_idx).unwrap_or(&Data::Empty);
        if matches!(ts_cell, Data::Empty) {
            continue;
        }
        let Some(ts) = cell_datetime(ts_cell) else {
            skipped += 1;
            continue;
        };
        timestamps.push(ts.and_utc().timestamp_millis());
        for (column, &idx) in values.iter_mut().zip(&value_idx) {
            column.push(row.get(idx).and_then(cell_number));
        }
    }

    if skipped > 0 {
        warn!(
            "Skipped {} rows with unreadable timestamps in sheet '{}'",
            skipped, sheet
        );
    }
    debug!("Read {} rows from sheet '{}'", timestamps.len(), sheet);

    let mut columns = Vec::with_capacity(value_headers.len() + 1);
    columns.push(
        Column::new(timestamp_header.into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
    );
    for (name, column) in value_headers.iter().zip(values) {
        columns.push(Column::new((*name).into(), column));
    }
    Ok(DataFrame::new(columns)?)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

fn cell_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::String(s) => parse_timestamp_text(s),
        // Excel serials, typed datetimes and ISO strings.
        other => other.as_datetime(),
    }
}

fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn cell_number(cell: &Data) -> Option<f64> {
    let value = match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}
