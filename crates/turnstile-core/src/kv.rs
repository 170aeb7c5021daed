//! Request, command, and result types for key-value operations.

use serde::Deserialize;
use serde::Serialize;

use crate::constants::MAX_KEY_SIZE;
use crate::constants::MAX_VALUE_SIZE;
use crate::error::KeyValueStoreError;

/// Commands for modifying key-value state.
///
/// Every command is atomic from the point of view of concurrent callers.
/// The coordination primitives rely on that atomicity; in particular an
/// existence-check followed by a plain write or delete is never a
/// substitute for `SetIfAbsent` / `CompareAndDelete`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum WriteCommand {
    /// Set a key-value pair only if the key is currently absent.
    ///
    /// `ttl_ms = None` stores the value without expiry.
    SetIfAbsent {
        key: String,
        value: String,
        ttl_ms: Option<u64>,
    },
    /// Compare-and-swap: atomically replace the value if the current value
    /// matches `expected` (`None` = key must be absent).
    CompareAndSwap {
        key: String,
        expected: Option<String>,
        new_value: String,
        ttl_ms: Option<u64>,
    },
    /// Compare-and-delete: atomically delete the key if the current value
    /// matches `expected`.
    CompareAndDelete { key: String, expected: String },
    /// Reset the TTL of an existing key.
    Expire { key: String, ttl_ms: u64 },
}

/// Request to perform a write operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteRequest {
    pub command: WriteCommand,
}

impl WriteRequest {
    /// Create a SetIfAbsent command.
    pub fn set_if_absent(key: impl Into<String>, value: impl Into<String>, ttl_ms: Option<u64>) -> Self {
        Self {
            command: WriteCommand::SetIfAbsent {
                key: key.into(),
                value: value.into(),
                ttl_ms,
            },
        }
    }

    /// Create a CompareAndSwap command.
    pub fn compare_and_swap(
        key: impl Into<String>,
        expected: Option<String>,
        new_value: impl Into<String>,
        ttl_ms: Option<u64>,
    ) -> Self {
        Self {
            command: WriteCommand::CompareAndSwap {
                key: key.into(),
                expected,
                new_value: new_value.into(),
                ttl_ms,
            },
        }
    }

    /// Create a CompareAndDelete command.
    pub fn compare_and_delete(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            command: WriteCommand::CompareAndDelete {
                key: key.into(),
                expected: expected.into(),
            },
        }
    }

    /// Create an Expire command.
    pub fn expire(key: impl Into<String>, ttl_ms: u64) -> Self {
        Self {
            command: WriteCommand::Expire { key: key.into(), ttl_ms },
        }
    }
}

/// Result of a write operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteResult {
    /// The command that was applied, echoed back.
    pub command: Option<WriteCommand>,
    /// For conditional commands: whether the write took effect.
    pub applied: Option<bool>,
    /// For `SetIfAbsent` with `applied = false`: the value already stored.
    pub current: Option<String>,
}

/// Request to read a value by key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadRequest {
    pub key: String,
}

impl ReadRequest {
    /// Create a read request for the given key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Result of a successful read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadResult {
    pub key: String,
    pub value: String,
}

/// Request to delete a key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteRequest {
    pub key: String,
}

impl DeleteRequest {
    /// Create a delete request for the given key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Result of a delete operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    pub key: String,
    /// Number of entries removed: 1 if the key existed, 0 otherwise.
    ///
    /// This count is the authoritative signal for single-use token
    /// consumption; the caller must not substitute a prior existence check.
    pub removed: u64,
}

/// Request to check whether a key exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExistsRequest {
    pub key: String,
}

impl ExistsRequest {
    /// Create an existence check for the given key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Result of an existence check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExistsResult {
    pub key: String,
    pub exists: bool,
}

/// Validate a write command against fixed size limits.
pub fn validate_write_command(command: &WriteCommand) -> Result<(), KeyValueStoreError> {
    let check_key = |key: &str| {
        if key.is_empty() {
            return Err(KeyValueStoreError::EmptyKey);
        }
        let len = key.len();
        if len > MAX_KEY_SIZE as usize {
            Err(KeyValueStoreError::KeyTooLarge {
                size: len as u32,
                max: MAX_KEY_SIZE,
            })
        } else {
            Ok(())
        }
    };

    let check_value = |value: &str| {
        let len = value.len();
        if len > MAX_VALUE_SIZE as usize {
            Err(KeyValueStoreError::ValueTooLarge {
                size: len as u32,
                max: MAX_VALUE_SIZE,
            })
        } else {
            Ok(())
        }
    };

    let check_ttl = |ttl_ms: u64| {
        if ttl_ms == 0 {
            Err(KeyValueStoreError::InvalidTtl { ttl_ms })
        } else {
            Ok(())
        }
    };

    match command {
        WriteCommand::SetIfAbsent { key, value, ttl_ms } => {
            check_key(key)?;
            check_value(value)?;
            if let Some(ttl_ms) = ttl_ms {
                check_ttl(*ttl_ms)?;
            }
        }
        WriteCommand::CompareAndSwap {
            key,
            expected,
            new_value,
            ttl_ms,
        } => {
            check_key(key)?;
            if let Some(expected) = expected {
                check_value(expected)?;
            }
            check_value(new_value)?;
            if let Some(ttl_ms) = ttl_ms {
                check_ttl(*ttl_ms)?;
            }
        }
        WriteCommand::CompareAndDelete { key, expected } => {
            check_key(key)?;
            check_value(expected)?;
        }
        WriteCommand::Expire { key, ttl_ms } => {
            check_key(key)?;
            check_ttl(*ttl_ms)?;
        }
    }

    Ok(())
}
