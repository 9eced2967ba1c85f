//! Request and response types shared by the controller, backends and fetchers.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// What the request is for, as reported by the host for each intercepted fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    Worker,
    /// No destination (`fetch()` from script, XHR).
    Empty,
    Other(String),
}

impl Destination {
    pub fn as_str(&self) -> &str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Worker => "worker",
            Destination::Empty => "",
            Destination::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for Destination {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "image" => Destination::Image,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            "worker" => Destination::Worker,
            "" => Destination::Empty,
            other => Destination::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response classification as seen from the controller's origin.
///
/// Only `Basic` responses are inspectable enough to be written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Basic,
    Cors,
    Opaque,
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            "error" => Ok(ResponseType::Error),
            other => Err(Error::Storage(format!("unknown response type: {other}"))),
        }
    }
}

/// A fully buffered HTTP response.
///
/// The body is read to completion before the response reaches the controller,
/// so `clone()` is enough to hand one copy to the caller and persist the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL the response was produced for.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether a network response may be written back to the cache store.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// An in-flight request handed to the controller by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    /// Upper-cased HTTP method.
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl InterceptedRequest {
    pub fn new(method: &str, url: Url, destination: Destination) -> Self {
        Self { method: method.trim().to_ascii_uppercase(), url, destination }
    }

    /// A GET request with no destination.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url, Destination::Empty)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Served from the current cache store.
    Cache,
    /// Fetched from the network after a cache miss.
    Network,
    /// Cached shell page served because the network failed for a document.
    ShellFallback,
    /// Forwarded to the network without consulting the cache.
    Passthrough,
}

/// Outcome of a single fetch interception.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub response: Response,
    pub source: ResponseSource,
}
