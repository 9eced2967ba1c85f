//! Client code for shellcache.
//!
//! This crate provides the HTTP network primitive the controller falls back to
//! on a cache miss and uses to fill the manifest at install time.

pub mod fetch;

pub use fetch::{FetchConfig, HttpFetcher, classify};
