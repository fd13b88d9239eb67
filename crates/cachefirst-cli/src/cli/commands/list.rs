use cachefirst_core::WorkerConfig;

use super::storage_for;
use crate::exit_codes::{self, EXIT_SUCCESS};

pub async fn run(config: WorkerConfig) -> anyhow::Result<i32> {
    let storage = storage_for(&config)?;
    let store = storage.open_disk(&config.cache_name).await?;

    let entries = match store.list().await {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("failed to list {}: {}", config.cache_name, e);
            return Ok(exit_codes::for_error(&e));
        }
    };

    if entries.is_empty() {
        println!("{} is empty", config.cache_name);
    }
    for meta in entries {
        println!(
            "{} {} {} {}B {}",
            meta.request.method,
            meta.request.url,
            meta.status,
            meta.size,
            meta.stored_at.to_rfc3339()
        );
    }

    Ok(EXIT_SUCCESS)
}
