//! Page selection: the overview or one station detail page.

/// Query value selecting the overview.
pub const OVERVIEW_PAGE: &str = "Overview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Overview,
    Station(String),
}

impl Page {
    /// Parses the `page` query parameter. A missing or empty value is the overview.
    pub fn from_query(page: Option<&str>) -> Self {
        match page.map(str::trim) {
            None | Some("") | Some(OVERVIEW_PAGE) => Page::Overview,
            Some(sheet) => Page::Station(sheet.to_string()),
        }
    }

    pub fn query_value(&self) -> &str {
        match self {
            Page::Overview => OVERVIEW_PAGE,
            Page::Station(sheet) => sheet,
        }
    }

    /// Link to this page.
    pub fn href(&self) -> String {
        match self {
            Page::Overview => "/".to_string(),
            Page::Station(sheet) => format!("/?page={}", urlencoding::encode(sheet)),
        }
    }

    pub fn is_selected(&self, sheet: &str) -> bool {
        matches!(self, Page::Station(s) if s == sheet)
    }
}
