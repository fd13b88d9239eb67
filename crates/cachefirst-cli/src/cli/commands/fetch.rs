use std::time::Duration;

use cachefirst_core::store::validate_put;
use cachefirst_core::{
    CacheStorage, Lifecycle, OfflineWorker, RequestKey, ResolveSource, Resolved, WorkerConfig,
};
use tracing::warn;

use super::storage_for;
use crate::cli::args::FetchArgs;
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(config: WorkerConfig, args: FetchArgs) -> anyhow::Result<i32> {
    let storage = storage_for(&config)?;
    let worker = OfflineWorker::from_config(config)?;

    if !args.no_activate {
        worker.on_activate().await?;
    }

    let request = if args.navigate {
        RequestKey::navigate(args.url.as_str())
    } else {
        RequestKey::get(args.url.as_str())
    };

    let mut resolved = worker.handle(request.clone()).await;
    // Decided before the body is read; validation rejects used bodies.
    let pending_write = awaits_cache_write(&request, &resolved);

    println!("{} {}", resolved.response.status, resolved.source);
    if args.include_body {
        println!("{}", resolved.response.text()?);
    }

    if pending_write {
        settle(&storage, &request, Duration::from_millis(args.settle_ms)).await;
    }

    Ok(EXIT_SUCCESS)
}

/// Whether resolution started a cache write the store will accept.
fn awaits_cache_write(request: &RequestKey, resolved: &Resolved) -> bool {
    matches!(resolved.source, ResolveSource::Network | ResolveSource::Preload)
        && validate_put(request, &resolved.response).is_ok()
}

/// Give the detached cache write a chance to land before the runtime exits.
async fn settle(storage: &dyn CacheStorage, request: &RequestKey, budget: Duration) {
    let step = Duration::from_millis(25);
    let mut waited = Duration::ZERO;
    while waited < budget {
        if let Ok(Some(_)) = storage.match_request(request).await {
            return;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
    warn!(request = %request, "cache write still pending at exit");
}
