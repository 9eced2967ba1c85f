//! sw_sync tool implementation.
//!
//! Delivers a background sync event. Only the configured tag is handled and the
//! handler itself does no deferred work yet.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheController, Error};

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag, e.g. "sync-analysis".
    pub tag: String,
}

/// Output from the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncOutput {
    pub tag: String,
    /// Whether the controller recognised the tag.
    pub handled: bool,
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(controller: &CacheController, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let handled = controller.sync(&params.tag).await?;

    let output = SwSyncOutput { tag: params.tag, handled };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
