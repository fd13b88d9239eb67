//! Network transport.
//!
//! Only transport failures are errors. Any HTTP status, including 4xx/5xx,
//! is a successful fetch and is relayed as a response.

use async_trait::async_trait;

use crate::error::CacheResult;
use crate::types::{RequestKey, Response};

pub mod fake;
mod http;

pub use http::{HttpTransport, USER_AGENT_VALUE};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &RequestKey) -> CacheResult<Response>;
}
