//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - The cache-first interception controller and its lifecycle
//! - Named cache stores with in-memory and SQLite backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod types;

pub use cache::{CacheDb, MemoryBackend, RequestKey, StorageBackend};
pub use config::AppConfig;
pub use controller::{CacheController, ControllerOptions, Phase};
pub use error::Error;
pub use fetch::Fetcher;
pub use types::{Destination, InterceptedRequest, Intercepted, Response, ResponseSource, ResponseType};
