//! Named cache stores mapping request keys to captured responses.
//!
//! A [`StorageBackend`] holds any number of named stores (namespaces). The
//! controller only ever reads and writes the store named after its current
//! version and deletes the others on activation. Two backends are provided:
//!
//! - [`MemoryBackend`]: process-local maps behind a tokio `RwLock`
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, versioned migrations

pub mod connection;
pub mod entries;
pub mod key;
pub mod memory;
pub mod migrations;

use async_trait::async_trait;

pub use crate::Error;
use crate::types::Response;

pub use connection::CacheDb;
pub use key::RequestKey;
pub use memory::MemoryBackend;

/// Storage capability injected into the controller.
///
/// Every `put` is atomic per key and the last writer wins. `put_all` stores a
/// whole batch or nothing.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Create the named store if it does not exist yet.
    async fn open(&self, store: &str) -> Result<(), Error>;

    /// Look up an entry by exact key. Missing stores behave as empty.
    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<Response>, Error>;

    /// Insert or replace one entry, creating the store if needed.
    async fn put(&self, store: &str, key: &RequestKey, response: &Response) -> Result<(), Error>;

    /// Insert or replace a batch of entries atomically.
    async fn put_all(&self, store: &str, entries: &[(RequestKey, Response)]) -> Result<(), Error>;

    /// Keys currently held by the named store, in insertion-independent order.
    async fn keys(&self, store: &str) -> Result<Vec<RequestKey>, Error>;

    /// Names of all existing stores.
    async fn list_namespaces(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and every entry in it. Returns whether it existed.
    async fn delete_namespace(&self, store: &str) -> Result<bool, Error>;
}
