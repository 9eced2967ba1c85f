//! Cache inspection tools.
//!
//! Read-only views of the current cache store; they never reach the network.

pub mod get;
pub mod keys;

pub use get::{CacheGetOutput, CacheGetParams, get_impl};
pub use keys::{CacheKeysOutput, keys_impl};
