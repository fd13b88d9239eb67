//! Filesystem helpers for the disk store.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{CacheFirstError, CacheResult};

pub(crate) fn default_root_dir() -> CacheResult<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| CacheFirstError::store("could not determine cache directory"))?;

    Ok(base.join("cachefirst").join("stores"))
}

/// Write via a uniquely named temp file and rename, so concurrent writers to
/// the same entry never observe each other's partial files.
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> CacheResult<()> {
    let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));

    fs::write(&temp_path, content)
        .await
        .map_err(|e| CacheFirstError::store(format!("failed to write temp file: {}", e)))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(CacheFirstError::store(format!(
            "failed to rename temp file: {}",
            e
        )));
    }

    Ok(())
}
