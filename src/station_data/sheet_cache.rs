//! Per-sheet Parquet cache of the source workbook.
//!
//! Each station sheet is materialized into `<cache_dir>/<sheet>.parquet`. A
//! cached file is reused as long as the source workbook is not strictly newer
//! than it. Regeneration of one sheet is serialized within the process and the
//! new file replaces the old one by rename, so a reader never opens a partially
//! written cache.

use crate::station_data::error::StationDataError;
use crate::station_data::transform::select_and_normalize;
use crate::station_data::workbook;
use crate::types::columns::SourceColumns;
use crate::types::station::StationSheet;
use log::{debug, info, warn};
use polars::prelude::*;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::{fs, task};

const CACHE_EXTENSION: &str = "parquet";

pub struct SheetCache {
    cache_dir: PathBuf,
    columns: SourceColumns,
    sheet_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SheetCache {
    pub fn new(cache_dir: &Path, columns: SourceColumns) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            columns,
            sheet_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Deterministic cache location for a sheet.
    ///
    /// The sheet name is percent-encoded, so distinct sheets never share a file.
    pub fn cache_path(&self, sheet_name: &str) -> PathBuf {
        self.cache_dir.join(format!(
            "{}.{}",
            urlencoding::encode(sheet_name),
            CACHE_EXTENSION
        ))
    }

    /// Makes sure the cache for `station` is current and returns its path.
    ///
    /// The sheet is re-read from `source` only when no cache exists or the
    /// source modification time is strictly newer than the cache's. Otherwise
    /// the cache file is left untouched.
    pub async fn materialize(
        &self,
        source: &Path,
        station: &StationSheet,
    ) -> Result<PathBuf, StationDataError> {
        let lock = self.sheet_lock(station.name()).await;
        let _guard = lock.lock().await;

        let cache_path = self.cache_path(station.name());
        if !Self::is_stale(source, &cache_path).await? {
            debug!("Cache hit for sheet {} at {:?}", station, cache_path);
            return Ok(cache_path);
        }

        warn!(
            "Cache for sheet {} missing or older than {:?}. Regenerating.",
            station, source
        );
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| StationDataError::CacheDirCreation(self.cache_dir.clone(), e))?;

        let df = self.read_station(source, station).await?;
        let rows = df.height();
        Self::cache_dataframe(df, &self.cache_dir, &cache_path).await?;
        info!(
            "Cached {} rows for sheet {} to {:?}",
            rows, station, cache_path
        );
        Ok(cache_path)
    }

    /// Reads a cached table back into memory.
    pub async fn load(&self, cache_path: &Path) -> Result<DataFrame, StationDataError> {
        let path = cache_path.to_path_buf();
        task::spawn_blocking(move || {
            LazyFrame::scan_parquet(&path, Default::default())
                .and_then(|lf| lf.collect())
                .map_err(|e| StationDataError::ParquetScan(path, e))
        })
        .await?
    }

    /// Removes every cached sheet. Returns how many files were deleted.
    ///
    /// Waits for regenerations already in progress, so a file written from
    /// a previous copy of the source cannot land after the clear.
    pub async fn clear(&self) -> Result<usize, StationDataError> {
        let mut locks: Vec<(String, Arc<Mutex<()>>)> = self
            .sheet_locks
            .lock()
            .await
            .iter()
            .map(|(name, lock)| (name.clone(), Arc::clone(lock)))
            .collect();
        locks.sort_by(|a, b| a.0.cmp(&b.0));
        let mut guards = Vec::with_capacity(locks.len());
        for (_, lock) in locks {
            guards.push(lock.lock_owned().await);
        }

        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StationDataError::CacheDeletionError(self.cache_dir.clone(), e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StationDataError::CacheDeletionError(self.cache_dir.clone(), e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == CACHE_EXTENSION) {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| StationDataError::CacheDeletionError(path.clone(), e))?;
                removed += 1;
            }
        }
        info!("Cleared {} cached sheets from {:?}", removed, self.cache_dir);
        Ok(removed)
    }

    async fn sheet_lock(&self, sheet_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.sheet_locks.lock().await;
        locks.entry(sheet_name.to_string()).or_default().clone()
    }

    async fn is_stale(source: &Path, cache_path: &Path) -> Result<bool, StationDataError> {
        let source_modified = modified(source)
            .await
            .map_err(|e| StationDataError::SourceMetadataRead(source.to_path_buf(), e))?;
        match modified(cache_path).await {
            Ok(cache_modified) => Ok(source_modified > cache_modified),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(StationDataError::CacheMetadataRead(cache_path.to_path_buf(), e)),
        }
    }

    async fn read_station(
        &self,
        source: &Path,
        station: &StationSheet,
    ) -> Result<DataFrame, StationDataError> {
        let source = source.to_path_buf();
        let station = station.clone();
        let columns = self.columns.clone();
        task::spawn_blocking(move || {
            let raw = workbook::read_columns(
                &source,
                station.name(),
                &columns.timestamp,
                &[station.code(), columns.pred_3h.as_str(), columns.pred_6h.as_str()],
            )
            .map_err(|e| match e {
                StationDataError::MissingColumnError { column, .. } => {
                    StationDataError::MissingColumnError {
                        station: station.code().to_string(),
                        column,
                    }
                }
                other => other,
            })?;
            select_and_normalize(&raw, &station, &columns)
        })
        .await?
    }

    /// Writes a DataFrame next to its destination and renames it into place.
    async fn cache_dataframe(
        mut df: DataFrame,
        cache_dir: &Path,
        path: &Path,
    ) -> Result<(), StationDataError> {
        let dir = cache_dir.to_path_buf();
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let mut temp = NamedTempFile::new_in(&dir)
                .map_err(|e| StationDataError::ParquetWriteIo(dir.clone(), e))?;
            ParquetWriter::new(temp.as_file_mut())
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| StationDataError::ParquetWritePolars(path_buf.clone(), e))?;
            temp.as_file()
                .sync_all()
                .map_err(|e| StationDataError::ParquetWriteIo(temp.path().to_path_buf(), e))?;
            temp.persist(&path_buf)
                .map_err(|e| StationDataError::ParquetWriteIo(path_buf.clone(), e.error))?;
            Ok::<(), StationDataError>(())
        })
        .await??;
        Ok(())
    }
}

async fn modified(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path).await?.modified()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hourly_rows, write_workbook};
    use std::time::Duration;

    fn file_mtime(path: &Path) -> SystemTime {
        std::fs::metadata(path).unwrap().modified().unwrap()
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn fresh_read(source: &Path, station: &StationSheet) -> DataFrame {
        let columns = SourceColumns::default();
        let raw = workbook::read_columns(
            source,
            station.name(),
            &columns.timestamp,
            &[station.code(), columns.pred_3h.as_str(), columns.pred_6h.as_str()],
        )
        .unwrap();
        select_and_normalize(&raw, station, &columns).unwrap()
    }

    #[test]
    fn test_cache_path_is_derived_from_sheet_name() {
        let cache = SheetCache::new(Path::new("/tmp/cache"), SourceColumns::default());
        assert_eq!(
            cache.cache_path("1018640_나주 대교"),
            Path::new("/tmp/cache/1018640_%EB%82%98%EC%A3%BC%20%EB%8C%80%EA%B5%90.parquet")
        );
        assert_eq!(
            cache.cache_path("00123_a/b"),
            Path::new("/tmp/cache/00123_a%2Fb.parquet")
        );
        assert_ne!(cache.cache_path("00123_a b"), cache.cache_path("00123_a_b"));
    }

    #[tokio::test]
    async fn test_unchanged_source_leaves_cache_untouched() -> Result<(), StationDataError> {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.xlsx");
        write_workbook(&source, &[("00123_Station", hourly_rows(10))]);
        let station = StationSheet::parse("00123_Station").unwrap();
        let cache = SheetCache::new(&dir.path().join("cache"), SourceColumns::default());

        let path = cache.materialize(&source, &station).await?;
        // Pin both mtimes so the comparison does not depend on clock granularity.
        let base = SystemTime::now() - Duration::from_secs(3600);
        set_mtime(&source, base);
        set_mtime(&path, base);

        let again = cache.materialize(&source, &station).await?;
        assert_eq!(again, path);
        assert_eq!(file_mtime(&path), base);
        Ok(())
    }

    #[tokio::test]
    async fn test_newer_source_regenerates_cache() -> Result<(), StationDataError> {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.xlsx");
        let station = StationSheet::parse("00123_Station").unwrap();
        write_workbook(&source, &[("00123_Station", hourly_rows(10))]);
        let cache = SheetCache::new(&dir.path().join("cache"), SourceColumns::default());

        let path = cache.materialize(&source, &station).await?;
        let base = SystemTime::now() - Duration::from_secs(3600);
        set_mtime(&path, base);

        write_workbook(&source, &[("00123_Station", hourly_rows(30))]);
        set_mtime(&source, base + Duration::from_secs(60));

        cache.materialize(&source, &station).await?;
        assert!(file_mtime(&path) > base);

        let cached = cache.load(&path).await?;
        let fresh = fresh_read(&source, &station);
        assert_eq!(cached.height(), 30);
        assert!(cached.equals_missing(&fresh));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_materialize_yields_one_readable_cache() -> Result<(), StationDataError> {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.xlsx");
        write_workbook(&source, &[("00123_Station", hourly_rows(20))]);
        let station = StationSheet::parse("00123_Station").unwrap();
        let cache = Arc::new(SheetCache::new(&dir.path().join("cache"), SourceColumns::default()));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let source = source.clone();
                let station = station.clone();
                tokio::spawn(async move { cache.materialize(&source, &station).await })
            })
            .collect();
        for t in tasks {
            let path = t.await.unwrap()?;
            assert_eq!(cache.load(&path).await?.height(), 20);
        }

        let leftovers = std::fs::read_dir(cache.cache_dir()).unwrap().count();
        assert_eq!(leftovers, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_station_column_is_reported_by_code() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.xlsx");
        let mut book = rust_xlsxwriter::Workbook::new();
        crate::test_support::add_station_sheet(&mut book, "00123_Station", "99999", &hourly_rows(3))
            .unwrap();
        book.save(&source).unwrap();
        let cache = SheetCache::new(&dir.path().join("cache"), SourceColumns::default());

        let err = cache
            .materialize(&source, &StationSheet::parse("00123_Station").unwrap())
            .await
            .unwrap_err();
        match err {
            StationDataError::MissingColumnError { station, column } => {
                assert_eq!(station, "00123");
                assert_eq!(column, "00123");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!cache.cache_path("00123_Station").exists());
    }

    #[tokio::test]
    async fn test_clear_removes_cached_sheets() -> Result<(), StationDataError> {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.xlsx");
        write_workbook(
            &source,
            &[("00100_A", hourly_rows(3)), ("00200_B", hourly_rows(3))],
        );
        let cache = SheetCache::new(&dir.path().join("cache"), SourceColumns::default());
        for name in ["00100_A", "00200_B"] {
            cache
                .materialize(&source, &StationSheet::parse(name).unwrap())
                .await?;
        }

        assert_eq!(cache.clear().await?, 2);
        assert_eq!(cache.clear().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_waits_for_running_regeneration() -> Result<(), StationDataError> {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.xlsx");
        write_workbook(&source, &[("00123_Station", hourly_rows(3))]);
        let station = StationSheet::parse("00123_Station").unwrap();
        let cache = Arc::new(SheetCache::new(&dir.path().join("cache"), SourceColumns::default()));
        let path = cache.materialize(&source, &station).await?;

        let lock = cache.sheet_lock(station.name()).await;
        let regenerating = lock.lock().await;
        let clearing = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.clear().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!clearing.is_finished());
        assert!(path.exists());

        drop(regenerating);
        assert_eq!(clearing.await.unwrap()?, 1);
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_without_cache_dir_is_a_no_op() -> Result<(), StationDataError> {
        let dir = tempfile::tempdir().unwrap();
        let cache = SheetCache::new(&dir.path().join("never-created"), SourceColumns::default());
        assert_eq!(cache.clear().await?, 0);
        Ok(())
    }
}
