//! Cache-first request resolution.
//!
//! Resolves a request with the following priority:
//! 1. Cache (any named store)
//! 2. Preload slot
//! 3. Network (the response also populates the cache)
//! 4. Cached fallback entry, only after a network failure
//! 5. Synthesized 408 response
//!
//! Resolution always produces a response. Store errors on the read path count
//! as misses, network errors select the fallback branch, and cache population
//! runs detached.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::preload::PreloadSlot;
use crate::store::CacheStorage;
use crate::transport::Transport;
use crate::types::{RequestKey, Response};
use crate::writer::CacheWriter;

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveSource {
    /// Existing cache entry for the request.
    Cache,

    /// Preloaded response.
    Preload,

    /// Fresh network response.
    Network,

    /// Cached fallback entry.
    Fallback,

    /// Synthesized 408 response.
    Synthesized,
}

impl fmt::Display for ResolveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cache => "cache",
            Self::Preload => "preload",
            Self::Network => "network",
            Self::Fallback => "fallback",
            Self::Synthesized => "synthesized",
        };
        f.write_str(label)
    }
}

/// Resolved response.
#[derive(Debug)]
pub struct Resolved {
    /// Response to hand back to the client.
    pub response: Response,

    /// Which step produced it.
    pub source: ResolveSource,
}

/// Input for one resolution.
pub struct FetchContext {
    /// Intercepted request.
    pub request: RequestKey,

    /// Preload slot supplied by the environment.
    pub preload: PreloadSlot,

    /// Identity of the pre-seeded offline page.
    pub fallback: RequestKey,
}

impl FetchContext {
    pub fn new(request: RequestKey, fallback: RequestKey) -> Self {
        Self {
            request,
            preload: PreloadSlot::empty(),
            fallback,
        }
    }

    pub fn with_preload(mut self, preload: PreloadSlot) -> Self {
        self.preload = preload;
        self
    }
}

/// The cache-first decision procedure.
#[derive(Clone)]
pub struct ResolutionPipeline {
    storage: Arc<dyn CacheStorage>,
    transport: Arc<dyn Transport>,
    writer: CacheWriter,
}

impl ResolutionPipeline {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        transport: Arc<dyn Transport>,
        cache_name: impl Into<String>,
    ) -> Self {
        let writer = CacheWriter::new(storage.clone(), cache_name);
        Self {
            storage,
            transport,
            writer,
        }
    }

    pub fn writer(&self) -> &CacheWriter {
        &self.writer
    }

    /// Resolve a request. Never fails.
    pub async fn cache_first(&self, ctx: FetchContext) -> Resolved {
        let FetchContext {
            request,
            preload,
            fallback,
        } = ctx;

        if let Some(response) = self.lookup(&request).await {
            debug!(request = %request, "serving from cache");
            return Resolved {
                response,
                source: ResolveSource::Cache,
            };
        }

        if let Some(response) = preload.resolve().await {
            info!(request = %request, status = response.status, "using preload response");
            return Resolved {
                response: self.populate(&request, response),
                source: ResolveSource::Preload,
            };
        }

        match self.transport.fetch(&request).await {
            Ok(response) => {
                debug!(request = %request, status = response.status, "serving from network");
                Resolved {
                    response: self.populate(&request, response),
                    source: ResolveSource::Network,
                }
            }
            Err(e) => {
                warn!(request = %request, error = %e, "network fetch failed, trying fallback");
                self.fallback(&fallback).await
            }
        }
    }

    /// Cache lookup where a store error is the same as a miss.
    async fn lookup(&self, request: &RequestKey) -> Option<Response> {
        match self.storage.match_request(request).await {
            Ok(found) => found,
            Err(e) => {
                warn!(request = %request, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Hand a copy to the detached writer and return the original.
    fn populate(&self, request: &RequestKey, response: Response) -> Response {
        match response.try_clone() {
            Ok(copy) => self.writer.spawn_put(request.clone(), copy),
            Err(e) => warn!(request = %request, error = %e, "cannot copy response for caching"),
        }
        response
    }

    async fn fallback(&self, fallback: &RequestKey) -> Resolved {
        if let Some(response) = self.lookup(fallback).await {
            debug!(fallback = %fallback, "serving fallback entry");
            return Resolved {
                response,
                source: ResolveSource::Fallback,
            };
        }

        warn!(fallback = %fallback, "fallback entry missing, synthesizing 408");
        Resolved {
            response: Response::request_timeout(),
            source: ResolveSource::Synthesized,
        }
    }
}
