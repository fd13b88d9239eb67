//! In-process cache storage.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use super::{validate_put, validate_store_name, CacheStorage, CacheStore};
use crate::error::CacheResult;
use crate::types::{RequestKey, Response};

#[derive(Debug)]
struct StoredEntry {
    request: RequestKey,
    status: u16,
    headers: BTreeMap<String, String>,
    body: Bytes,
}

/// A named in-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, request: &RequestKey) -> CacheResult<Option<Response>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&request.cache_id()).map(|entry| {
            Response::from_parts(entry.status, entry.headers.clone(), entry.body.clone())
        }))
    }

    async fn put(&self, request: &RequestKey, response: Response) -> CacheResult<()> {
        validate_put(request, &response)?;
        let (status, headers, body) = response.into_parts()?;

        self.entries.write().await.insert(
            request.cache_id(),
            StoredEntry {
                request: request.clone(),
                status,
                headers,
                body,
            },
        );
        debug!(store = %self.name, request = %request, "stored entry");
        Ok(())
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        let entries = self.entries.read().await;
        let mut keys: Vec<RequestKey> = entries.values().map(|e| e.request.clone()).collect();
        keys.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(keys)
    }
}

/// In-memory storage. Stores are searched in creation order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    stores: Arc<RwLock<Vec<Arc<MemoryStore>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheStore>> {
        validate_store_name(name)?;

        if let Some(store) = self.stores.read().await.iter().find(|s| s.name == name) {
            return Ok(store.clone());
        }

        let mut stores = self.stores.write().await;
        // Another task may have created it between the two locks.
        if let Some(store) = stores.iter().find(|s| s.name == name) {
            return Ok(store.clone());
        }
        let store = Arc::new(MemoryStore::new(name));
        stores.push(store.clone());
        debug!(store = name, "created memory store");
        Ok(store)
    }

    async fn names(&self) -> CacheResult<Vec<String>> {
        Ok(self
            .stores
            .read()
            .await
            .iter()
            .map(|s| s.name.clone())
            .collect())
    }
}
