//! Core traits for turnstile operations.

use async_trait::async_trait;

use crate::error::KeyValueStoreError;
use crate::kv::DeleteRequest;
use crate::kv::DeleteResult;
use crate::kv::ExistsRequest;
use crate::kv::ExistsResult;
use crate::kv::ReadRequest;
use crate::kv::ReadResult;
use crate::kv::WriteRequest;
use crate::kv::WriteResult;

/// Shared low-latency key-value store interface.
///
/// This is the single synchronization point for the coordination
/// primitives: no in-process mutable state is shared across the
/// guard/lock boundary. Implementations must guarantee that every
/// [`WriteCommand`](crate::kv::WriteCommand) and [`delete`](KeyValueStore::delete)
/// executes atomically with respect to concurrent callers, and that a key
/// whose TTL has elapsed is indistinguishable from an absent key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Apply a write command (conditional set, compare-and-swap,
    /// compare-and-delete, or TTL reset).
    async fn write(&self, request: WriteRequest) -> Result<WriteResult, KeyValueStoreError>;

    /// Read a value by key. An absent key is `Err(NotFound)`.
    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError>;

    /// Delete a key from the store.
    ///
    /// Returns the number of entries removed (0 or 1). Deleting an absent
    /// key is not an error; it reports `removed = 0`.
    async fn delete(&self, request: DeleteRequest) -> Result<DeleteResult, KeyValueStoreError>;

    /// Check whether a key currently exists.
    async fn exists(&self, request: ExistsRequest) -> Result<ExistsResult, KeyValueStoreError>;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn write(&self, request: WriteRequest) -> Result<WriteResult, KeyValueStoreError> {
        (**self).write(request).await
    }

    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError> {
        (**self).read(request).await
    }

    async fn delete(&self, request: DeleteRequest) -> Result<DeleteResult, KeyValueStoreError> {
        (**self).delete(request).await
    }

    async fn exists(&self, request: ExistsRequest) -> Result<ExistsResult, KeyValueStoreError> {
        (**self).exists(request).await
    }
}
