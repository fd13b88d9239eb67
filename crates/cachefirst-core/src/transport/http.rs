//! reqwest-backed transport.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::debug;
use url::Url;

use super::Transport;
use crate::error::{CacheFirstError, CacheResult};
use crate::types::{RequestKey, Response};

pub const USER_AGENT_VALUE: &str = concat!("cachefirst/", env!("CARGO_PKG_VERSION"));

/// HTTP transport resolving request URLs against a fixed origin.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    origin: Url,
}

impl HttpTransport {
    pub fn new(origin: &str, timeout: Duration) -> CacheResult<Self> {
        let origin = Url::parse(origin).map_err(|e| CacheFirstError::Config {
            message: format!("invalid origin {:?}: {}", origin, e),
        })?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| CacheFirstError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute URL for a request; paths are joined onto the origin.
    pub fn resolve(&self, request: &RequestKey) -> CacheResult<Url> {
        self.origin
            .join(&request.url)
            .map_err(|e| CacheFirstError::InvalidRequest {
                message: format!("cannot resolve {:?}: {}", request.url, e),
            })
    }

    fn build(&self, request: &RequestKey) -> CacheResult<reqwest::RequestBuilder> {
        let url = self.resolve(request)?;
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            CacheFirstError::InvalidRequest {
                message: format!("invalid method {:?}: {}", request.method, e),
            }
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CacheFirstError::InvalidRequest {
                    message: format!("invalid header name {:?}: {}", name, e),
                }
            })?;
            let value =
                HeaderValue::from_str(value).map_err(|e| CacheFirstError::InvalidRequest {
                    message: format!("invalid header value for {}: {}", name, e),
                })?;
            headers.insert(name, value);
        }

        Ok(self.client.request(method, url).headers(headers))
    }
}

/// Flatten response headers into one value per name.
///
/// Repeated headers are joined with `", "`. Values that are not valid UTF-8
/// cannot be stored and are dropped.
fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            debug!(header = %name, "dropping non-UTF-8 header value");
            continue;
        };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &RequestKey) -> CacheResult<Response> {
        let builder = self.build(request)?;
        debug!(request = %request, "fetching from network");

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());

        let body = response.bytes().await.map_err(|e| CacheFirstError::Network {
            message: format!("failed to read response body: {}", e),
        })?;

        debug!(request = %request, status, size = body.len(), "network response");
        Ok(Response::from_parts(status, headers, body))
    }
}
