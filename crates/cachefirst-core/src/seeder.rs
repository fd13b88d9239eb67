//! Bulk seeding of the store at install time.
//!
//! Every resource is fetched before anything is written. One failed fetch or
//! one non-2xx response fails the whole batch and leaves the store untouched.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::error::{CacheFirstError, CacheResult};
use crate::store::CacheStorage;
use crate::transport::Transport;
use crate::types::{RequestKey, Response};

pub struct BulkCacheSeeder {
    storage: Arc<dyn CacheStorage>,
    transport: Arc<dyn Transport>,
    cache_name: String,
}

impl BulkCacheSeeder {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        transport: Arc<dyn Transport>,
        cache_name: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            transport,
            cache_name: cache_name.into(),
        }
    }

    /// Fetch and store every resource. Returns the number of entries written.
    pub async fn add_resources_to_cache(&self, resources: &[RequestKey]) -> CacheResult<usize> {
        let store = self.storage.open(&self.cache_name).await?;
        info!(cache = %self.cache_name, count = resources.len(), "seeding cache");

        let fetched = try_join_all(resources.iter().map(|r| self.fetch_one(r))).await?;
        let entries: Vec<(RequestKey, Response)> =
            resources.iter().cloned().zip(fetched).collect();
        let count = entries.len();

        store
            .put_all(entries)
            .await
            .map_err(|e| CacheFirstError::Seed {
                resource: format!("store {}", self.cache_name),
                reason: e.to_string(),
            })?;

        info!(cache = %self.cache_name, count, "cache seeded");
        Ok(count)
    }

    async fn fetch_one(&self, request: &RequestKey) -> CacheResult<Response> {
        let response =
            self.transport
                .fetch(request)
                .await
                .map_err(|e| CacheFirstError::Seed {
                    resource: request.url.clone(),
                    reason: e.to_string(),
                })?;

        if !response.ok() {
            return Err(CacheFirstError::Seed {
                resource: request.url.clone(),
                reason: format!("HTTP {}", response.status),
            });
        }

        debug!(request = %request, status = response.status, "fetched seed resource");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;
    use crate::transport::fake::FakeTransport;

    fn seeder(transport: FakeTransport) -> (BulkCacheSeeder, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (
            BulkCacheSeeder::new(storage.clone(), Arc::new(transport), "v1"),
            storage,
        )
    }

    fn keys(paths: &[&str]) -> Vec<RequestKey> {
        paths.iter().map(|p| RequestKey::get(*p)).collect()
    }

    #[tokio::test]
    async fn test_seeds_every_resource() {
        let transport = FakeTransport::new()
            .route("/", 200, "root")
            .route("/docs", 200, "docs");
        let (seeder, storage) = seeder(transport);

        let count = seeder
            .add_resources_to_cache(&keys(&["/", "/docs"]))
            .await
            .unwrap();

        assert_eq!(count, 2);
        let store = storage.open("v1").await.unwrap();
        let mut docs = store.get(&RequestKey::get("/docs")).await.unwrap().unwrap();
        assert_eq!(docs.text().unwrap(), "docs");
    }

    #[tokio::test]
    async fn test_one_failed_fetch_fails_the_batch() {
        let transport = FakeTransport::new()
            .route("/", 200, "root")
            .fail("/docs", "connection refused");
        let (seeder, storage) = seeder(transport);

        let err = seeder
            .add_resources_to_cache(&keys(&["/", "/docs"]))
            .await
            .unwrap_err();

        match err {
            CacheFirstError::Seed { resource, .. } => assert_eq!(resource, "/docs"),
            other => panic!("expected Seed error, got {:?}", other),
        }
        let store = storage.open("v1").await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_ok_status_fails_the_batch() {
        let transport = FakeTransport::new()
            .route("/", 200, "root")
            .route("/gone", 404, "not found");
        let (seeder, _storage) = seeder(transport);

        let err = seeder
            .add_resources_to_cache(&keys(&["/", "/gone"]))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("HTTP 404"), "{}", err);
    }

    #[tokio::test]
    async fn test_empty_seed_list_creates_store() {
        let (seeder, storage) = seeder(FakeTransport::new());
        assert_eq!(seeder.add_resources_to_cache(&[]).await.unwrap(), 0);
        assert!(storage.has("v1").await.unwrap());
    }
}
