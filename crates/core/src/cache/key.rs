//! Request identity used as the cache-store key.

use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

use crate::Error;

/// Method plus absolute URL, with the fragment stripped.
///
/// Two requests share a cache entry exactly when their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url: url.into() }
    }

    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }

    /// Rebuild a key read back from storage.
    pub(crate) fn from_parts(method: String, url: String) -> Self {
        Self { method, url }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Content-addressed form used as the SQLite primary key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Resolve a possibly relative URL (manifest entry, shell path) against `origin`.
pub fn resolve(origin: &Url, input: &str) -> Result<Url, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("empty URL".into()));
    }

    let mut url = origin.join(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(Error::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }

    url.set_fragment(None);
    Ok(url)
}

/// Whether `url` shares scheme, host and port with `origin`.
pub fn same_origin(origin: &Url, url: &Url) -> bool {
    origin.origin() == url.origin()
}
