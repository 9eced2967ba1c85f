//! cache_keys tool implementation.
//!
//! Lists the requests held by the current cache store.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheController, Error};

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub cache_name: String,
    /// Cached request URLs, sorted.
    pub urls: Vec<String>,
}

pub async fn keys_output(controller: &CacheController) -> Result<CacheKeysOutput, Error> {
    let urls = controller
        .cached_keys()
        .await?
        .iter()
        .map(|key| key.url().to_string())
        .collect();
    Ok(CacheKeysOutput { cache_name: controller.cache_name().to_string(), urls })
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let output = keys_output(controller).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
