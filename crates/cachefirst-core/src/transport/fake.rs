use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use super::Transport;
use crate::error::{CacheFirstError, CacheResult};
use crate::types::{RequestKey, Response};

#[derive(Debug, Clone)]
enum Route {
    Respond { status: u16, body: Bytes },
    Fail(String),
}

/// In-process transport with canned routes.
///
/// Unrouted URLs fail like an offline network.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<RequestKey>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, status: u16, body: impl Into<Bytes>) -> Self {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route::Respond {
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn fail(self, url: &str, message: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Fail(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received, in order.
    pub fn requests(&self) -> Vec<RequestKey> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, request: &RequestKey) -> CacheResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        let route = self.routes.lock().unwrap().get(&request.url).cloned();
        match route {
            Some(Route::Respond { status, body }) => Ok(Response::new(status, body)),
            Some(Route::Fail(message)) => Err(CacheFirstError::Network { message }),
            None => Err(CacheFirstError::Network {
                message: format!("offline: {}", request.url),
            }),
        }
    }
}
