//! Worker configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheFirstError, CacheResult};
use crate::types::RequestKey;

/// Configuration for an [`OfflineWorker`](crate::worker::OfflineWorker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Name of the store all writes go to.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Origin that relative request URLs resolve against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Pre-seeded offline page served after a network failure.
    #[serde(default = "default_fallback")]
    pub fallback: String,

    /// Resources seeded at install time, in order.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Network request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Root directory of the disk store (platform cache dir when unset).
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Enable navigation preload on activation.
    #[serde(default = "default_navigation_preload")]
    pub navigation_preload: bool,
}

fn default_cache_name() -> String {
    "v1".to_string()
}

fn default_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_fallback() -> String {
    "/index.html".to_string()
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/docs",
        "/examples",
        "/files",
        "/manual",
        "/src",
        "/playground",
        "/utils",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_timeout() -> u64 {
    30
}

fn default_navigation_preload() -> bool {
    true
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            origin: default_origin(),
            fallback: default_fallback(),
            precache: default_precache(),
            timeout_secs: default_timeout(),
            cache_dir: None,
            navigation_preload: default_navigation_preload(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `CACHEFIRST_CACHE_NAME` | Store name |
    /// | `CACHEFIRST_ORIGIN` | Origin for relative URLs |
    /// | `CACHEFIRST_FALLBACK` | Offline page path |
    /// | `CACHEFIRST_TIMEOUT` | Network timeout in seconds |
    /// | `CACHEFIRST_CACHE_DIR` | Disk store root |
    /// | `CACHEFIRST_NAVIGATION_PRELOAD` | `0`/`false` disables preload |
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of this config.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("CACHEFIRST_CACHE_NAME") {
            self.cache_name = v;
        }
        if let Ok(v) = std::env::var("CACHEFIRST_ORIGIN") {
            self.origin = v;
        }
        if let Ok(v) = std::env::var("CACHEFIRST_FALLBACK") {
            self.fallback = v;
        }
        if let Some(v) = std::env::var("CACHEFIRST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.timeout_secs = v;
        }
        if let Ok(v) = std::env::var("CACHEFIRST_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("CACHEFIRST_NAVIGATION_PRELOAD") {
            self.navigation_preload = !(v == "0" || v.eq_ignore_ascii_case("false"));
        }
        self
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(content: &str) -> CacheResult<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| CacheFirstError::Config {
            message: format!("failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file.
    pub fn load(path: &Path) -> CacheResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheFirstError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.cache_name.trim().is_empty() {
            return Err(CacheFirstError::Config {
                message: "cache_name must not be empty".to_string(),
            });
        }
        if self.fallback.trim().is_empty() {
            return Err(CacheFirstError::Config {
                message: "fallback must not be empty".to_string(),
            });
        }
        url::Url::parse(&self.origin).map_err(|e| CacheFirstError::Config {
            message: format!("invalid origin {:?}: {}", self.origin, e),
        })?;
        Ok(())
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn with_precache<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache = resources.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn fallback_request(&self) -> RequestKey {
        RequestKey::get(self.fallback.as_str())
    }

    pub fn precache_requests(&self) -> Vec<RequestKey> {
        self.precache
            .iter()
            .map(|p| RequestKey::get(p.as_str()))
            .collect()
    }
}
