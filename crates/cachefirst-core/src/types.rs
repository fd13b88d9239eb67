//! Request identity and single-read response payloads.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CacheFirstError, CacheResult};

/// Body of the synthesized response returned when every other source failed.
pub const OFFLINE_BODY: &str = "Network error happened";

/// How the request was issued by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Top-level document navigation (eligible for navigation preload).
    Navigate,

    /// Any other subresource request.
    #[default]
    Other,
}

/// Immutable request descriptor used as cache key and as the unit fetched
/// from the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestKey {
    /// HTTP method, upper-cased.
    pub method: String,

    /// URL exactly as supplied (path or absolute URL).
    pub url: String,

    /// Request headers with lower-cased names.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request mode.
    #[serde(default)]
    pub mode: RequestMode,
}

impl RequestKey {
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            url: url.into(),
            headers: BTreeMap::new(),
            mode: RequestMode::Other,
        }
    }

    /// A plain `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// A `GET` navigation request.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::get(url).with_mode(RequestMode::Navigate)
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Identity compared by stores: method and URL, exact match.
    ///
    /// Headers are sent to the network but do not take part in matching.
    pub fn cache_id(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

impl From<&str> for RequestKey {
    fn from(url: &str) -> Self {
        Self::get(url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Read state of a response body.
#[derive(Debug)]
enum Body {
    Unread(Bytes),
    Used,
}

/// Response payload: status, headers and a body that can be read once.
///
/// `Response` is intentionally not `Clone`. Any path that both caches and
/// returns a response has to call [`Response::try_clone`] while the body is
/// still unread.
#[derive(Debug)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,

    /// Response headers with lower-cased names.
    pub headers: BTreeMap<String, String>,

    body: Body,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Body::Unread(body.into()),
        }
    }

    /// Rebuild a response from stored parts.
    pub fn from_parts(status: u16, headers: BTreeMap<String, String>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body: Body::Unread(body),
        }
    }

    /// The 408 response synthesized when neither network nor fallback exist.
    pub fn request_timeout() -> Self {
        Self::new(408, OFFLINE_BODY).with_header("content-type", "text/plain")
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn body_used(&self) -> bool {
        matches!(self.body, Body::Used)
    }

    /// Produce a second, independently readable copy.
    ///
    /// Cloning a consumed response is a programming error: it panics in debug
    /// builds and returns [`CacheFirstError::BodyUsed`] otherwise.
    pub fn try_clone(&self) -> CacheResult<Self> {
        debug_assert!(!self.body_used(), "cannot clone a response whose body was read");
        match &self.body {
            // Bytes clones share the buffer; each copy is read independently.
            Body::Unread(bytes) => Ok(Self {
                status: self.status,
                headers: self.headers.clone(),
                body: Body::Unread(bytes.clone()),
            }),
            Body::Used => Err(CacheFirstError::BodyUsed),
        }
    }

    /// Consume the body.
    ///
    /// A second read panics in debug builds and returns
    /// [`CacheFirstError::BodyUsed`] otherwise.
    pub fn bytes(&mut self) -> CacheResult<Bytes> {
        debug_assert!(!self.body_used(), "response body read twice");
        match std::mem::replace(&mut self.body, Body::Used) {
            Body::Unread(bytes) => Ok(bytes),
            Body::Used => Err(CacheFirstError::BodyUsed),
        }
    }

    /// Consume the body as UTF-8 text (lossy).
    pub fn text(&mut self) -> CacheResult<String> {
        let bytes = self.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Consume the response into its parts.
    pub fn into_parts(mut self) -> CacheResult<(u16, BTreeMap<String, String>, Bytes)> {
        let body = self.bytes()?;
        Ok((self.status, self.headers, body))
    }
}
