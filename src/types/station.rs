//! Defines the station sheet identity: the mapping from a spreadsheet tab name
//! such as `00123_Station` to the station code naming its actual-level column.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a sheet name could not be turned into a [`StationSheet`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetNameError {
    #[error("Sheet '{0}' has no '_' separating station code and description")]
    MissingSeparator(String),

    #[error("Sheet '{sheet}' has station code '{code}', expected one or more ASCII digits")]
    InvalidCode { sheet: String, code: String },

    #[error("Sheet '{0}' has an empty description after the station code")]
    EmptyDescription(String),
}

/// A monitoring station, identified by the spreadsheet tab holding its data.
///
/// Sheet names follow `<code>_<description>`: the code is the numeric station
/// identifier and also the header of the column holding the observed level.
/// Construction through [`StationSheet::parse`] validates that shape, so a
/// `StationSheet` always names a column that can be looked up.
///
/// # Examples
///
/// ```
/// use waterlevel_dashboard::StationSheet;
///
/// let sheet = StationSheet::parse("00123_Station").unwrap();
/// assert_eq!(sheet.code(), "00123");
/// assert_eq!(sheet.name(), "00123_Station");
///
/// assert!(StationSheet::parse("Summary").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StationSheet {
    name: String,
    code: String,
    label: String,
}

impl StationSheet {
    /// Validates a sheet name and splits it on the first `_`.
    pub fn parse(sheet_name: &str) -> Result<Self, SheetNameError> {
        let (code, description) = sheet_name
            .split_once('_')
            .ok_or_else(|| SheetNameError::MissingSeparator(sheet_name.to_string()))?;

        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(SheetNameError::InvalidCode {
                sheet: sheet_name.to_string(),
                code: code.to_string(),
            });
        }
        let label = description.trim();
        if label.is_empty() {
            return Err(SheetNameError::EmptyDescription(sheet_name.to_string()));
        }

        Ok(Self {
            name: sheet_name.to_string(),
            code: code.to_string(),
            label: label.to_string(),
        })
    }

    /// The full tab name, e.g. `00123_Station`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The numeric station code, e.g. `00123`.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for StationSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The sheets of one workbook, split into usable stations and rejected names.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: Vec<StationSheet>,
    rejected: Vec<(String, SheetNameError)>,
}

impl StationCatalog {
    /// Builds a catalog from sheet names in workbook order.
    pub fn from_sheet_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::default();
        for name in names {
            match StationSheet::parse(name.as_ref()) {
                Ok(sheet) => catalog.stations.push(sheet),
                Err(e) => catalog.rejected.push((name.as_ref().to_string(), e)),
            }
        }
        catalog
    }

    pub fn stations(&self) -> &[StationSheet] {
        &self.stations
    }

    /// Sheets skipped because their name does not follow `<code>_<description>`.
    pub fn rejected(&self) -> &[(String, SheetNameError)] {
        &self.rejected
    }

    /// Looks up a station by its sheet name.
    ///
    /// Returns `Ok(None)` for names not present in the workbook at all and the
    /// validation error for sheets that exist but were rejected.
    pub fn find(&self, sheet_name: &str) -> Result<Option<&StationSheet>, SheetNameError> {
        if let Some(sheet) = self.stations.iter().find(|s| s.name() == sheet_name) {
            return Ok(Some(sheet));
        }
        match self.rejected.iter().find(|(name, _)| name == sheet_name) {
            Some((_, e)) => Err(e.clone()),
            None => Ok(None),
        }
    }
}
