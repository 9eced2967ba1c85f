//! cache_get tool implementation.
//!
//! Retrieves a cached response by URL without touching the network.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::cache::key::resolve;
use shellcache_core::{CacheController, Error};

use crate::tools::sw_fetch::ResponseOutput;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path relative to the controller origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// The cached response.
    pub response: ResponseOutput,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(controller: &CacheController, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(controller.origin(), &params.url)?;
    let response = controller
        .lookup(&url)
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheGetOutput { response: ResponseOutput::from(&response) };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
