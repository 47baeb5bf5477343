//! Column names of the station tables, both as they appear in the source
//! spreadsheet and as the normalized logical names used after the transform.

use serde::{Deserialize, Serialize};

pub const COL_TIMESTAMP: &str = "timestamp";
pub const COL_ACTUAL_LEVEL: &str = "actual_level";
pub const COL_PRED_3H: &str = "pred_3h";
pub const COL_PRED_6H: &str = "pred_6h";

/// Logical columns of a normalized station table, in order.
pub const NORMALIZED_COLUMNS: [&str; 4] = [COL_TIMESTAMP, COL_ACTUAL_LEVEL, COL_PRED_3H, COL_PRED_6H];

/// Header names expected in every station sheet of the source spreadsheet.
///
/// The actual-level column has no fixed header: it is named after the station
/// code, see [`crate::StationSheet::code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceColumns {
    pub timestamp: String,
    pub pred_3h: String,
    pub pred_6h: String,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            timestamp: "일시".to_string(),
            pred_3h: "예측 수위(3시간)".to_string(),
            pred_6h: "예측 수위(6시간)".to_string(),
        }
    }
}

impl SourceColumns {
    /// The four headers to read from a station sheet, in normalized order.
    pub fn required_for(&self, station_code: &str) -> [String; 4] {
        [
            self.timestamp.clone(),
            station_code.to_string(),
            self.pred_3h.clone(),
            self.pred_6h.clone(),
        ]
    }
}

/// Column headings shown to users for a normalized table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLabels {
    pub timestamp: String,
    pub actual_level: String,
    pub pred_3h: String,
    pub pred_6h: String,
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            timestamp: "일시".to_string(),
            actual_level: "실제수위".to_string(),
            pred_3h: "예측 수위(3시간)".to_string(),
            pred_6h: "예측 수위(6시간)".to_string(),
        }
    }
}
