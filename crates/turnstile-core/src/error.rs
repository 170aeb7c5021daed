//! Error types for key-value store operations.
//!
//! Every store failure is an explicit variant with actionable context.
//! Callers building primitives on top of the store must treat `Timeout`
//! and `Failed` as unknown outcomes, never as success.

use thiserror::Error;

/// Errors from key-value store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyValueStoreError {
    /// The requested key does not exist (or its TTL has elapsed).
    #[error("key '{key}' not found")]
    NotFound { key: String },

    /// A conditional write or delete found a value other than expected.
    #[error("compare-and-swap failed for key '{key}': expected {expected:?}, found {actual:?}")]
    CompareAndSwapFailed {
        key: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// Keys must be non-empty.
    #[error("key cannot be empty")]
    EmptyKey,

    /// Key exceeds the fixed size limit.
    #[error("key size {size} exceeds maximum of {max} bytes")]
    KeyTooLarge { size: u32, max: u32 },

    /// Value exceeds the fixed size limit.
    #[error("value size {size} exceeds maximum of {max} bytes")]
    ValueTooLarge { size: u32, max: u32 },

    /// TTLs must be strictly positive.
    #[error("ttl of {ttl_ms}ms is not valid")]
    InvalidTtl { ttl_ms: u64 },

    /// The store did not answer in time; the outcome of the operation is unknown.
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The store reported a failure.
    #[error("operation failed: {reason}")]
    Failed { reason: String },
}
