//! Network fetch capability consumed by the controller.

use async_trait::async_trait;

use crate::Error;
use crate::types::{InterceptedRequest, Response};

/// Performs a network request and returns a fully buffered response.
///
/// Implementations return `Err` only when no response could be produced at all
/// (DNS, connect, timeout, body read). HTTP error statuses are responses.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<Response, Error>;
}
