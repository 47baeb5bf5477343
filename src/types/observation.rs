use chrono::NaiveDateTime;
use serde::Serialize;

/// One timestamped record of a station table.
///
/// Levels are in metres and already rounded to two decimals by the row
/// transform. Any of them may be missing: the newest rows of a sheet carry
/// predictions before the actual level is observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub actual_level: Option<f64>,
    pub pred_3h: Option<f64>,
    pub pred_6h: Option<f64>,
}

impl Observation {
    /// All levels present in this row.
    pub fn levels(&self) -> impl Iterator<Item = f64> {
        [self.actual_level, self.pred_3h, self.pred_6h]
            .into_iter()
            .flatten()
    }
}
