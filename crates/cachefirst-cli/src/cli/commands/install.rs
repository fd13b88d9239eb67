use cachefirst_core::{Lifecycle, OfflineWorker, WorkerConfig};

use crate::exit_codes::{self, EXIT_SUCCESS};

pub async fn run(config: WorkerConfig) -> anyhow::Result<i32> {
    let count = config.precache.len();
    let cache_name = config.cache_name.clone();
    let worker = OfflineWorker::from_config(config)?;

    match worker.on_install().await {
        Ok(()) => {
            println!("seeded {} resources into {}", count, cache_name);
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("install failed: {}", e);
            Ok(exit_codes::for_error(&e))
        }
    }
}
