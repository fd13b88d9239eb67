//! Persistent cache storage on the local filesystem.
//!
//! Each entry is one file: a single line of JSON metadata followed by the raw
//! body. The file is replaced by one atomic rename, so concurrent writers to
//! the same key leave exactly one of their entries behind.
//!
//! Reads verify the body against the digest recorded at write time, so a
//! torn or tampered entry surfaces as [`CacheFirstError::Integrity`] instead of
//! being served.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use super::{validate_put, validate_store_name, CacheStorage, CacheStore};
use crate::digest::{sha256_hex, sha256_prefixed};
use crate::error::{CacheFirstError, CacheResult};
use crate::types::{RequestKey, Response};

pub(crate) mod io;

const ENTRY_EXT: &str = "entry";

/// Metadata stored in the header line of each entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Request the entry was stored under.
    pub request: RequestKey,

    /// Response status.
    pub status: u16,

    /// Response headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Body digest (sha256:...).
    pub digest: String,

    /// Body size in bytes.
    pub size: u64,

    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}

/// Serialize an entry: compact JSON header, newline, body.
fn encode_entry(meta: &EntryMeta, body: &[u8]) -> CacheResult<Vec<u8>> {
    // Compact JSON escapes newlines inside strings, so the header is one line.
    let mut content = serde_json::to_vec(meta)
        .map_err(|e| CacheFirstError::store(format!("failed to serialize metadata: {}", e)))?;
    content.reserve(body.len() + 1);
    content.push(b'\n');
    content.extend_from_slice(body);
    Ok(content)
}

fn parse_header(header: &[u8]) -> CacheResult<EntryMeta> {
    serde_json::from_slice(header)
        .map_err(|e| CacheFirstError::store(format!("failed to parse entry metadata: {}", e)))
}

fn decode_entry(content: Vec<u8>) -> CacheResult<(EntryMeta, Bytes)> {
    let split = content
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| CacheFirstError::store("truncated entry: missing metadata line"))?;
    let meta = parse_header(&content[..split])?;
    let body = Bytes::from(content).slice(split + 1..);
    Ok((meta, body))
}

/// A named store backed by one directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    name: String,
    dir: PathBuf,
}

impl DiskStore {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, request: &RequestKey) -> PathBuf {
        self.dir.join(format!(
            "{}.{}",
            sha256_hex(request.cache_id().as_bytes()),
            ENTRY_EXT
        ))
    }

    /// Read only the metadata line of an entry file.
    async fn read_header(path: &Path) -> CacheResult<EntryMeta> {
        let file = fs::File::open(path)
            .await
            .map_err(|e| CacheFirstError::store(format!("failed to open entry: {}", e)))?;
        let mut header = Vec::new();
        BufReader::new(file)
            .read_until(b'\n', &mut header)
            .await
            .map_err(|e| CacheFirstError::store(format!("failed to read entry metadata: {}", e)))?;
        if header.pop() != Some(b'\n') {
            return Err(CacheFirstError::store("truncated entry: missing metadata line"));
        }
        parse_header(&header)
    }

    /// Entry metadata without loading the body.
    pub async fn metadata(&self, request: &RequestKey) -> Option<EntryMeta> {
        Self::read_header(&self.entry_path(request)).await.ok()
    }

    /// All entry metadata in this store, ordered by URL.
    pub async fn list(&self) -> CacheResult<Vec<EntryMeta>> {
        let mut result = Vec::new();

        if !self.dir.exists() {
            return Ok(result);
        }

        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| CacheFirstError::store(format!("failed to read store directory: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheFirstError::store(format!("failed to read directory entry: {}", e)))?
        {
            let path = entry.path();
            // Skips temp files from in-flight writes.
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            match Self::read_header(&path).await {
                Ok(meta) => result.push(meta),
                Err(e) => debug!(path = %path.display(), error = %e, "skipping unreadable entry"),
            }
        }

        result.sort_by(|a, b| a.request.url.cmp(&b.request.url));
        Ok(result)
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, request: &RequestKey) -> CacheResult<Option<Response>> {
        let path = self.entry_path(request);

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(store = %self.name, request = %request, "entry not in store");
                return Ok(None);
            }
            Err(e) => {
                return Err(CacheFirstError::store(format!(
                    "failed to read entry: {}",
                    e
                )))
            }
        };
        let (meta, body) = decode_entry(content)?;

        // Two identities with colliding hashes would share a file.
        if meta.request.cache_id() != request.cache_id() {
            return Ok(None);
        }

        let actual = sha256_prefixed(&body);
        if actual != meta.digest {
            warn!(
                store = %self.name,
                request = %request,
                expected = %meta.digest,
                actual = %actual,
                "store integrity check failed"
            );
            return Err(CacheFirstError::Integrity {
                key: request.cache_id(),
                expected: meta.digest,
                actual,
            });
        }

        debug!(store = %self.name, request = %request, "store hit");
        Ok(Some(Response::from_parts(meta.status, meta.headers, body)))
    }

    async fn put(&self, request: &RequestKey, response: Response) -> CacheResult<()> {
        validate_put(request, &response)?;
        let (status, headers, body) = response.into_parts()?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheFirstError::store(format!("failed to create store directory: {}", e)))?;

        let meta = EntryMeta {
            request: request.clone(),
            status,
            headers,
            digest: sha256_prefixed(&body),
            size: body.len() as u64,
            stored_at: Utc::now(),
        };
        let content = encode_entry(&meta, &body)?;

        // The rename is the only commit point for the entry.
        io::write_atomic(&self.entry_path(request), &content).await?;

        debug!(store = %self.name, request = %request, size = meta.size, "stored entry");
        Ok(())
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        Ok(self.list().await?.into_iter().map(|m| m.request).collect())
    }
}

/// Storage rooted at one directory; each store is a subdirectory.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Storage in the default location.
    ///
    /// Default: `{platform cache dir}/cachefirst/stores`
    pub fn new() -> CacheResult<Self> {
        Ok(Self {
            root: io::default_root_dir()?,
        })
    }

    pub fn with_dir(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a store with its concrete type.
    pub async fn open_disk(&self, name: &str) -> CacheResult<DiskStore> {
        validate_store_name(name)?;
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheFirstError::store(format!("failed to open store {}: {}", name, e)))?;
        Ok(DiskStore {
            name: name.to_string(),
            dir,
        })
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheStore>> {
        Ok(Arc::new(self.open_disk(name).await?))
    }

    async fn names(&self) -> CacheResult<Vec<String>> {
        let mut names = Vec::new();

        if !self.root.exists() {
            return Ok(names);
        }

        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| CacheFirstError::store(format!("failed to read storage root: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheFirstError::store(format!("failed to read directory entry: {}", e)))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && validate_store_name(&name).is_ok() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(validate_store_name(name).is_ok() && self.root.join(name).is_dir())
    }
}
