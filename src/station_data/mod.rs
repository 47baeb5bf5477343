pub mod error;
pub mod sheet_cache;
pub mod table;
pub mod table_fetcher;
pub mod transform;
pub mod workbook;
