//! Cache store adapters.
//!
//! A [`CacheStorage`] is the environment-owned registry of named stores; a
//! [`CacheStore`] is one named mapping from request identity to response.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStorage`]: process-local, for tests and embedded hosts
//! - [`DiskStorage`]: persistent, one directory per store
//!
//! ```text
//! {root}/{store name}/{sha256(identity)}.entry
//!   line 1          # JSON metadata: request, status, headers, digest
//!   rest            # Response body
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{CacheFirstError, CacheResult};
use crate::types::{RequestKey, Response};

mod disk;
mod memory;

pub use disk::{DiskStorage, DiskStore, EntryMeta};
pub use memory::{MemoryStorage, MemoryStore};

/// One named cache store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store name.
    fn name(&self) -> &str;

    /// Look up a response for an equivalent request identity.
    ///
    /// Every call yields a fresh, unread response.
    async fn get(&self, request: &RequestKey) -> CacheResult<Option<Response>>;

    /// Store a response, consuming its body. Last write wins.
    async fn put(&self, request: &RequestKey, response: Response) -> CacheResult<()>;

    /// Store several entries. All entries are validated before any is written.
    async fn put_all(&self, entries: Vec<(RequestKey, Response)>) -> CacheResult<()> {
        for (request, response) in &entries {
            validate_put(request, response)?;
        }
        for (request, response) in entries {
            self.put(&request, response).await?;
        }
        Ok(())
    }

    /// Request identities currently stored.
    async fn keys(&self) -> CacheResult<Vec<RequestKey>>;
}

/// Registry of named cache stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store by name, creating it on first access.
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheStore>>;

    /// Names of existing stores, in lookup order.
    async fn names(&self) -> CacheResult<Vec<String>>;

    /// Whether a store with this name exists.
    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.names().await?.iter().any(|n| n == name))
    }

    /// Search every store in order and return the first match.
    ///
    /// A store that fails to open or read is skipped, so an unreadable entry
    /// in one store never hides a valid entry in a later one.
    async fn match_request(&self, request: &RequestKey) -> CacheResult<Option<Response>> {
        for name in self.names().await? {
            let store = match self.open(&name).await {
                Ok(store) => store,
                Err(e) => {
                    warn!(store = %name, error = %e, "failed to open store, skipping");
                    continue;
                }
            };
            match store.get(request).await {
                Ok(Some(response)) => return Ok(Some(response)),
                Ok(None) => {}
                Err(e) => {
                    warn!(store = %name, request = %request, error = %e, "store read failed, skipping");
                }
            }
        }
        Ok(None)
    }
}

/// Checks applied before a response is written to any store.
///
/// Only `GET` requests are cacheable, partial content is rejected, and the body
/// must still be unread.
pub fn validate_put(request: &RequestKey, response: &Response) -> CacheResult<()> {
    if request.method != "GET" {
        return Err(CacheFirstError::InvalidRequest {
            message: format!("cannot cache {} request for {}", request.method, request.url),
        });
    }
    if response.status == 206 {
        return Err(CacheFirstError::InvalidRequest {
            message: format!("cannot cache partial response for {}", request.url),
        });
    }
    if response.body_used() {
        return Err(CacheFirstError::BodyUsed);
    }
    Ok(())
}

/// Store names become directory names, so keep them to a safe alphabet.
pub(crate) fn validate_store_name(name: &str) -> CacheResult<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(CacheFirstError::InvalidRequest {
            message: format!("invalid cache name: {:?}", name),
        })
    }
}
