//! MCP tool implementations.
//!
//! Each tool maps one host event or inspection call onto the cache controller.
#![allow(unused_imports)]

pub mod cache;
pub mod sw_fetch;
pub mod sw_status;
pub mod sw_sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheGetParams, CacheKeysOutput};
pub use sw_fetch::{ResponseOutput, SwFetchOutput, SwFetchParams};
pub use sw_status::SwStatusOutput;
pub use sw_sync::{SwSyncOutput, SwSyncParams};
