use crate::cache::clock::Clock;
use crate::cache::ttl_cache::TtlCache;
use crate::station_data::error::StationDataError;
use crate::station_data::sheet_cache::SheetCache;
use crate::station_data::table::StationTable;
use crate::types::columns::SourceColumns;
use crate::types::station::StationSheet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Hands out station tables, backed by the on-disk sheet cache and an
/// in-memory cache whose entries expire after a fixed time-to-live.
pub struct TableFetcher {
    sheet_cache: SheetCache,
    table_cache: TtlCache<String, Arc<StationTable>>,
}

impl TableFetcher {
    pub fn new(
        cache_dir: &Path,
        columns: SourceColumns,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sheet_cache: SheetCache::new(cache_dir, columns),
            table_cache: TtlCache::new(ttl, clock),
        }
    }

    pub fn sheet_cache(&self) -> &SheetCache {
        &self.sheet_cache
    }

    /// Gets the table of one station, using the in-memory cache if possible.
    pub async fn get_station_table(
        &self,
        source: &Path,
        station: &StationSheet,
    ) -> Result<Arc<StationTable>, StationDataError> {
        self.table_cache
            .get_or_try_compute(station.name().to_string(), || async {
                let cache_path = self.sheet_cache.materialize(source, station).await?;
                let frame = self.sheet_cache.load(&cache_path).await?;
                Ok(Arc::new(StationTable::new(station.clone(), frame)))
            })
            .await
    }

    /// Drops every in-memory table and every cached sheet on disk.
    pub async fn invalidate_all(&self) -> Result<(), StationDataError> {
        self.table_cache.invalidate_all().await;
        self.sheet_cache.clear().await?;
        Ok(())
    }
}
