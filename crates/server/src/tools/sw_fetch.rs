//! sw_fetch tool implementation.
//!
//! Delivers one intercepted request to the controller and reports which
//! response it produced and where that response came from.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::cache::key::resolve;
use shellcache_core::{CacheController, Destination, Error, InterceptedRequest, Response, ResponseSource};

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the controller origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests use the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: "document", "image", "script", ... Empty for fetch()/XHR.
    #[serde(default)]
    pub destination: String,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderOutput {
    pub name: String,
    pub value: String,
}

/// A response rendered for tool output. The body is decoded as lossy UTF-8.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// "basic", "cors", "opaque" or "error".
    pub response_type: String,
    pub headers: Vec<HeaderOutput>,
    pub body: String,
    pub body_bytes: usize,
}

impl From<&Response> for ResponseOutput {
    fn from(response: &Response) -> Self {
        Self {
            url: response.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            response_type: response.response_type.as_str().to_string(),
            headers: response
                .headers
                .iter()
                .map(|(name, value)| HeaderOutput { name: name.clone(), value: value.clone() })
                .collect(),
            body: String::from_utf8_lossy(&response.body).to_string(),
            body_bytes: response.body.len(),
        }
    }
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// "cache", "network", "shell_fallback" or "passthrough".
    pub source: ResponseSource,
    pub response: ResponseOutput,
}

/// Run the interception and build the structured output.
pub async fn fetch_output(controller: &CacheController, params: SwFetchParams) -> Result<SwFetchOutput, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()));
    }

    let url = resolve(controller.origin(), &params.url)?;
    let request = InterceptedRequest::new(&params.method, url, Destination::from(params.destination.as_str()));
    let intercepted = controller.handle_fetch(&request).await?;

    Ok(SwFetchOutput { source: intercepted.source, response: ResponseOutput::from(&intercepted.response) })
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(controller: &CacheController, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let output = fetch_output(controller, params).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
