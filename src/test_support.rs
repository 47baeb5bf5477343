//! Spreadsheet fixtures shared by unit tests.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{Workbook, XlsxError};
use std::path::Path;

pub(crate) type FixtureRow = (NaiveDateTime, Option<f64>, f64, f64);

pub(crate) fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, 16)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// `count` hourly rows with slowly rising levels; the last row has no actual level yet.
pub(crate) fn hourly_rows(count: usize) -> Vec<FixtureRow> {
    (0..count)
        .map(|i| {
            let level = 1.0 + i as f64 * 0.013;
            let actual = (i + 1 < count).then_some(level);
            (
                start_time() + Duration::hours(i as i64),
                actual,
                level + 0.021,
                level + 0.047,
            )
        })
        .collect()
}

/// Adds a station sheet whose actual-level header is `level_header`.
pub(crate) fn add_station_sheet(
    workbook: &mut Workbook,
    name: &str,
    level_header: &str,
    rows: &[FixtureRow],
) -> Result<(), XlsxError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;
    sheet.write_string(0, 0, "일시")?;
    sheet.write_string(0, 1, "강수량")?;
    sheet.write_string(0, 2, level_header)?;
    sheet.write_string(0, 3, "예측 수위(3시간)")?;
    sheet.write_string(0, 4, "예측 수위(6시간)")?;
    for (i, (ts, actual, pred_3h, pred_6h)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, ts.format("%Y-%m-%d %H:%M").to_string())?;
        sheet.write_number(row, 1, 0.0)?;
        if let Some(actual) = actual {
            sheet.write_number(row, 2, *actual)?;
        }
        sheet.write_number(row, 3, *pred_3h)?;
        sheet.write_number(row, 4, *pred_6h)?;
    }
    Ok(())
}

/// Writes a workbook holding one conforming sheet per `(name, rows)` pair.
pub(crate) fn write_workbook(path: &Path, sheets: &[(&str, Vec<FixtureRow>)]) {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let code = name.split('_').next().unwrap();
        add_station_sheet(&mut workbook, name, code, rows).unwrap();
    }
    workbook.save(path).unwrap();
}
