//! Store Module
//!
//! The key/value byte store the cache persists responses into, plus the
//! in-memory and on-disk backends.

mod disk;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::cache::{RequestKey, StoredEntry};
use crate::error::Result;

pub use disk::DiskStore;
pub use memory::MemoryStore;

/// A body read back chunk by chunk.
pub type BodyStream = BoxStream<'static, std::io::Result<Bytes>>;

// == Store Handle ==
/// Handle to an opened named store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreHandle {
    name: String,
}

impl StoreHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// == Cache Store Trait ==
/// Asynchronous key/value store holding responses under named stores.
///
/// `keys` returns keys in the store's native order; both shipped backends
/// use insertion order, with a re-inserted key moving to the end.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Opens a store, creating it if it does not exist.
    async fn open(&self, store_name: &str) -> Result<StoreHandle>;

    /// Looks up an entry.
    async fn lookup(&self, handle: &StoreHandle, key: &RequestKey) -> Result<Option<StoredEntry>>;

    /// Inserts or replaces an entry.
    async fn put(&self, handle: &StoreHandle, key: &RequestKey, entry: StoredEntry) -> Result<()>;

    /// Deletes an entry, returning whether it existed.
    async fn delete(&self, handle: &StoreHandle, key: &RequestKey) -> Result<bool>;

    /// All keys in enumeration order.
    async fn keys(&self, handle: &StoreHandle) -> Result<Vec<RequestKey>>;

    /// Streams an entry's body without loading it whole.
    async fn open_body(&self, handle: &StoreHandle, key: &RequestKey) -> Result<Option<BodyStream>>;

    /// Deletes a whole store, returning whether it existed.
    async fn delete_store(&self, store_name: &str) -> Result<bool>;

    /// Names of every store the backend holds, including foreign ones.
    async fn list_store_names(&self) -> Result<Vec<String>>;
}
