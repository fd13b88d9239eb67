//! Cache-first request interception.
//!
//! This crate answers intercepted requests from a local cache when it can and
//! degrades through a fixed chain otherwise:
//!
//! - Cache lookup across every named store
//! - Navigation preload response, if the environment supplied one
//! - Network fetch, whose response is also written to the cache
//! - Pre-seeded fallback entry, after a network failure
//! - Synthesized `408 Request Timeout` with a plain-text body
//!
//! Every intercepted request resolves to a response, even with the network
//! gone entirely.
//!
//! # Quick Start
//!
//! ```no_run
//! use cachefirst_core::{Lifecycle, OfflineWorker, RequestKey, WorkerConfig};
//!
//! # async fn example() -> cachefirst_core::CacheResult<()> {
//! let worker = OfflineWorker::from_config(WorkerConfig::from_env())?;
//!
//! // Install: seed the cache. Failure here means offline support is not ready.
//! worker.on_install().await?;
//! worker.on_activate().await?;
//!
//! let resolved = worker.handle(RequestKey::navigate("/docs")).await;
//! println!("{} via {}", resolved.response.status, resolved.source);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `CACHEFIRST_CACHE_NAME` | Store name (default: `v1`) |
//! | `CACHEFIRST_ORIGIN` | Origin relative URLs resolve against |
//! | `CACHEFIRST_FALLBACK` | Offline page (default: `/index.html`) |
//! | `CACHEFIRST_TIMEOUT` | Network timeout in seconds (default: 30) |
//! | `CACHEFIRST_CACHE_DIR` | Disk store root |
//! | `CACHEFIRST_NAVIGATION_PRELOAD` | Enable preload on activate (default: true) |

pub mod config;
mod digest;
pub mod error;
pub mod pipeline;
pub mod preload;
pub mod seeder;
pub mod store;
pub mod transport;
pub mod types;
pub mod worker;
pub mod writer;

// Re-export main types
pub use config::WorkerConfig;
pub use error::{CacheFirstError, CacheResult};
pub use pipeline::{FetchContext, ResolutionPipeline, ResolveSource, Resolved};
pub use preload::{
    enable_navigation_preload, NavigationPreloadManager, PreloadSender, PreloadSlot,
    PreloadState, Registration, PRELOAD_HEADER,
};
pub use seeder::BulkCacheSeeder;
pub use store::{
    CacheStorage, CacheStore, DiskStorage, DiskStore, EntryMeta, MemoryStorage, MemoryStore,
};
pub use transport::{HttpTransport, Transport, USER_AGENT_VALUE};
pub use types::{RequestKey, RequestMode, Response, OFFLINE_BODY};
pub use worker::{Lifecycle, OfflineWorker};
pub use writer::CacheWriter;
