//! Lifecycle hooks invoked by the hosting environment.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::WorkerConfig;
use crate::error::CacheResult;
use crate::pipeline::{FetchContext, ResolutionPipeline, Resolved};
use crate::preload::{enable_navigation_preload, PreloadSlot, Registration};
use crate::seeder::BulkCacheSeeder;
use crate::store::{CacheStorage, DiskStorage};
use crate::transport::{HttpTransport, Transport};
use crate::types::{RequestKey, Response};

/// Hooks the environment registers against its own event model.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Seed the cache. The worker is ready to serve offline only after this
    /// returns `Ok`.
    async fn on_install(&self) -> CacheResult<()>;

    /// Enable capabilities for subsequent requests.
    async fn on_activate(&self) -> CacheResult<()>;

    /// Answer an intercepted request. Always yields a response.
    async fn on_fetch(&self, request: RequestKey, preload: PreloadSlot) -> Response;
}

/// Offline-first worker: seeds on install, enables preload on activate, and
/// answers fetches cache-first.
pub struct OfflineWorker {
    config: WorkerConfig,
    registration: Registration,
    transport: Arc<dyn Transport>,
    seeder: BulkCacheSeeder,
    pipeline: ResolutionPipeline,
}

impl OfflineWorker {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        transport: Arc<dyn Transport>,
        registration: Registration,
    ) -> Self {
        let seeder = BulkCacheSeeder::new(storage.clone(), transport.clone(), &config.cache_name);
        let pipeline = ResolutionPipeline::new(storage, transport.clone(), &config.cache_name);
        Self {
            config,
            registration,
            transport,
            seeder,
            pipeline,
        }
    }

    /// Worker backed by the disk store and the HTTP transport.
    pub fn from_config(config: WorkerConfig) -> CacheResult<Self> {
        config.validate()?;
        let storage = match &config.cache_dir {
            Some(dir) => DiskStorage::with_dir(dir),
            None => DiskStorage::new()?,
        };
        let transport = HttpTransport::new(&config.origin, config.timeout())?;
        Ok(Self::new(
            config,
            Arc::new(storage),
            Arc::new(transport),
            Registration::with_navigation_preload(),
        ))
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn pipeline(&self) -> &ResolutionPipeline {
        &self.pipeline
    }

    /// Resolve a request with a preload slot taken from the registration.
    pub async fn handle(&self, request: RequestKey) -> Resolved {
        let preload = self
            .registration
            .preload_for(&request, self.transport.clone());
        self.resolve(request, preload).await
    }

    /// Resolve a request with an explicit preload slot.
    pub async fn resolve(&self, request: RequestKey, preload: PreloadSlot) -> Resolved {
        let ctx = FetchContext::new(request, self.config.fallback_request()).with_preload(preload);
        self.pipeline.cache_first(ctx).await
    }
}

#[async_trait]
impl Lifecycle for OfflineWorker {
    async fn on_install(&self) -> CacheResult<()> {
        let count = self
            .seeder
            .add_resources_to_cache(&self.config.precache_requests())
            .await?;
        info!(cache = %self.config.cache_name, count, "install complete");
        Ok(())
    }

    async fn on_activate(&self) -> CacheResult<()> {
        if self.config.navigation_preload {
            enable_navigation_preload(&self.registration);
        }
        Ok(())
    }

    async fn on_fetch(&self, request: RequestKey, preload: PreloadSlot) -> Response {
        self.resolve(request, preload).await.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ResolveSource;
    use crate::store::MemoryStorage;
    use crate::transport::fake::FakeTransport;

    fn worker(transport: FakeTransport, registration: Registration) -> OfflineWorker {
        let config = WorkerConfig::default()
            .with_precache(["/", "/offline.html"])
            .with_fallback("/offline.html");
        OfflineWorker::new(
            config,
            Arc::new(MemoryStorage::new()),
            Arc::new(transport),
            registration,
        )
    }

    #[tokio::test]
    async fn test_install_then_serve_offline() {
        let transport = FakeTransport::new()
            .route("/", 200, "home")
            .route("/offline.html", 200, "offline page");
        let worker = worker(transport, Registration::without_navigation_preload());

        worker.on_install().await.unwrap();

        let mut home = worker.on_fetch(RequestKey::get("/"), PreloadSlot::empty()).await;
        assert_eq!(home.text().unwrap(), "home");

        let mut missing = worker
            .on_fetch(RequestKey::get("/never-seen"), PreloadSlot::empty())
            .await;
        assert_eq!(missing.text().unwrap(), "offline page");
    }

    #[tokio::test]
    async fn test_install_fails_when_seed_fails() {
        let transport = FakeTransport::new().route("/", 200, "home");
        let worker = worker(transport, Registration::without_navigation_preload());

        assert!(worker.on_install().await.is_err());
    }

    #[tokio::test]
    async fn test_activate_enables_preload() {
        let transport = FakeTransport::new().route("/page", 200, "preloaded page");
        let worker = worker(transport.clone(), Registration::with_navigation_preload());

        worker.on_activate().await.unwrap();
        assert!(worker
            .registration()
            .navigation_preload()
            .unwrap()
            .is_enabled());

        let resolved = worker.handle(RequestKey::navigate("/page")).await;
        assert_eq!(resolved.source, ResolveSource::Preload);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_activate_respects_config() {
        let config = WorkerConfig {
            navigation_preload: false,
            ..WorkerConfig::default()
        };
        let worker = OfflineWorker::new(
            config,
            Arc::new(MemoryStorage::new()),
            Arc::new(FakeTransport::new()),
            Registration::with_navigation_preload(),
        );

        worker.on_activate().await.unwrap();
        assert!(!worker
            .registration()
            .navigation_preload()
            .unwrap()
            .is_enabled());
    }

    #[tokio::test]
    async fn test_activate_without_capability_is_ok() {
        let worker = worker(FakeTransport::new(), Registration::without_navigation_preload());
        worker.on_activate().await.unwrap();

        let resolved = worker.handle(RequestKey::navigate("/")).await;
        assert_eq!(resolved.source, ResolveSource::Synthesized);
        assert_eq!(resolved.response.status, 408);
    }
}
