//! Cache population writes.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::CacheResult;
use crate::store::CacheStorage;
use crate::types::{RequestKey, Response};

/// Commits request/response pairs into the named store.
#[derive(Clone)]
pub struct CacheWriter {
    storage: Arc<dyn CacheStorage>,
    cache_name: String,
}

impl CacheWriter {
    pub fn new(storage: Arc<dyn CacheStorage>, cache_name: impl Into<String>) -> Self {
        Self {
            storage,
            cache_name: cache_name.into(),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Open the store and write one entry.
    pub async fn put_in_cache(&self, request: &RequestKey, response: Response) -> CacheResult<()> {
        let store = self.storage.open(&self.cache_name).await?;
        store.put(request, response).await
    }

    /// Write one entry as a detached task.
    ///
    /// Nothing joins the task. Failures are logged and dropped; they never
    /// reach the caller that is delivering the other copy of the response.
    pub fn spawn_put(&self, request: RequestKey, response: Response) {
        let writer = self.clone();
        tokio::spawn(async move {
            match writer.put_in_cache(&request, response).await {
                Ok(()) => debug!(cache = %writer.cache_name, request = %request, "cache populated"),
                Err(e) => warn!(
                    cache = %writer.cache_name,
                    request = %request,
                    error = %e,
                    "background cache write failed"
                ),
            }
        });
    }
}
