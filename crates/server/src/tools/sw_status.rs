//! sw_status tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheController, Error, Phase};

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub phase: Phase,
    pub cache_name: String,
    pub origin: String,
    /// Every store the backend holds, including stale ones before activation.
    pub stores: Vec<String>,
}

pub async fn status_output(controller: &CacheController) -> Result<SwStatusOutput, Error> {
    Ok(SwStatusOutput {
        phase: controller.phase().await,
        cache_name: controller.cache_name().to_string(),
        origin: controller.origin().to_string(),
        stores: controller.store_names().await?,
    })
}

/// Implementation of the sw_status tool.
pub async fn status_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let output = status_output(controller).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
