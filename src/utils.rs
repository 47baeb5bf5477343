use log::warn;
use std::path::PathBuf;

const CACHE_DIR_NAME: &str = "waterlevel_dashboard";

/// The per-user cache directory for sheet caches.
///
/// Falls back to the system temp directory on platforms without a cache dir.
pub fn default_cache_dir() -> PathBuf {
    match dirs::cache_dir() {
        Some(dir) => dir.join(CACHE_DIR_NAME),
        None => {
            warn!("Could not determine system cache directory, using temp dir");
            std::env::temp_dir().join(CACHE_DIR_NAME)
        }
    }
}
