//! Navigation preload.
//!
//! The environment may start fetching a navigation request while the worker
//! is still deciding how to answer it. The in-flight result reaches the
//! pipeline as a [`PreloadSlot`]; when preload is unavailable or disabled the
//! slot is simply empty.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use reqwest::header::HeaderValue;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::{CacheFirstError, CacheResult};
use crate::transport::Transport;
use crate::types::{RequestKey, Response};

/// Header sent with preload requests.
pub const PRELOAD_HEADER: &str = "service-worker-navigation-preload";

const DEFAULT_HEADER_VALUE: &str = "true";

enum SlotState {
    Empty,
    Ready(Response),
    Pending(oneshot::Receiver<Option<Response>>),
}

/// Per-request preload value, consumed at most once.
pub struct PreloadSlot {
    state: SlotState,
}

impl PreloadSlot {
    pub fn empty() -> Self {
        Self {
            state: SlotState::Empty,
        }
    }

    pub fn ready(response: Response) -> Self {
        Self {
            state: SlotState::Ready(response),
        }
    }

    /// A slot filled later through the returned sender.
    pub fn pending() -> (PreloadSender, Self) {
        let (tx, rx) = oneshot::channel();
        (
            PreloadSender(tx),
            Self {
                state: SlotState::Pending(rx),
            },
        )
    }

    /// Wait for the preload result. A dropped sender counts as empty.
    pub async fn resolve(self) -> Option<Response> {
        match self.state {
            SlotState::Empty => None,
            SlotState::Ready(response) => Some(response),
            SlotState::Pending(rx) => rx.await.ok().flatten(),
        }
    }
}

impl Default for PreloadSlot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Completes a pending [`PreloadSlot`].
pub struct PreloadSender(oneshot::Sender<Option<Response>>);

impl PreloadSender {
    pub fn send(self, response: Option<Response>) {
        // The receiving request may already be gone.
        let _ = self.0.send(response);
    }

    /// Whether the slot was dropped without being resolved.
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Snapshot of the preload configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreloadState {
    pub enabled: bool,
    pub header_value: String,
}

/// The environment's navigation preload capability.
#[derive(Debug)]
pub struct NavigationPreloadManager {
    enabled: AtomicBool,
    header_value: RwLock<String>,
}

impl Default for NavigationPreloadManager {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            header_value: RwLock::new(DEFAULT_HEADER_VALUE.to_string()),
        }
    }
}

impl NavigationPreloadManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable preload. Returns whether this call changed the state.
    pub fn enable(&self) -> bool {
        !self.enabled.swap(true, Ordering::SeqCst)
    }

    /// Disable preload. Returns whether this call changed the state.
    pub fn disable(&self) -> bool {
        self.enabled.swap(false, Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Value sent in the preload request header.
    pub fn set_header_value(&self, value: &str) -> CacheResult<()> {
        if value.is_empty() || HeaderValue::from_str(value).is_err() {
            return Err(CacheFirstError::Config {
                message: format!("invalid preload header value: {:?}", value),
            });
        }
        match self.header_value.write() {
            Ok(mut guard) => *guard = value.to_string(),
            Err(poisoned) => *poisoned.into_inner() = value.to_string(),
        }
        Ok(())
    }

    pub fn header_value(&self) -> String {
        match self.header_value.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn state(&self) -> PreloadState {
        PreloadState {
            enabled: self.is_enabled(),
            header_value: self.header_value(),
        }
    }

    /// Start a preload fetch for an eligible request.
    ///
    /// Only enabled managers preload, and only `GET` navigations are eligible.
    /// A failed preload resolves the slot to empty.
    pub fn dispatch(&self, request: &RequestKey, transport: Arc<dyn Transport>) -> PreloadSlot {
        if !self.is_enabled() || !request.is_navigation() || request.method != "GET" {
            return PreloadSlot::empty();
        }

        let preload_request = request
            .clone()
            .with_header(PRELOAD_HEADER, self.header_value());
        let (sender, slot) = PreloadSlot::pending();

        tokio::spawn(async move {
            match transport.fetch(&preload_request).await {
                Ok(response) => sender.send(Some(response)),
                Err(e) => {
                    debug!(request = %preload_request, error = %e, "preload fetch failed");
                    sender.send(None);
                }
            }
        });

        slot
    }
}

/// Worker registration as seen by the worker itself.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    navigation_preload: Option<Arc<NavigationPreloadManager>>,
}

impl Registration {
    /// A registration whose environment supports navigation preload.
    pub fn with_navigation_preload() -> Self {
        Self {
            navigation_preload: Some(Arc::new(NavigationPreloadManager::new())),
        }
    }

    /// A registration without the capability.
    pub fn without_navigation_preload() -> Self {
        Self::default()
    }

    pub fn navigation_preload(&self) -> Option<&Arc<NavigationPreloadManager>> {
        self.navigation_preload.as_ref()
    }

    /// Preload slot for an incoming request (empty without the capability).
    pub fn preload_for(&self, request: &RequestKey, transport: Arc<dyn Transport>) -> PreloadSlot {
        match &self.navigation_preload {
            Some(manager) => manager.dispatch(request, transport),
            None => PreloadSlot::empty(),
        }
    }
}

/// Turn on navigation preload if the environment supports it.
///
/// Idempotent. Returns whether preload is enabled afterwards; a missing
/// capability is not an error.
pub fn enable_navigation_preload(registration: &Registration) -> bool {
    match registration.navigation_preload() {
        Some(manager) => {
            if manager.enable() {
                info!("navigation preload enabled");
            }
            true
        }
        None => {
            debug!("navigation preload not supported");
            false
        }
    }
}
