//! In-memory implementation of [`KeyValueStore`] for testing.
//!
//! Provides a deterministic, non-persistent implementation of the store
//! contract for use in unit tests and simulation. It mirrors the behavior
//! of production backends (Redis and friends) without network I/O,
//! including per-key TTL: an entry past its deadline is indistinguishable
//! from an absent one on every operation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::KeyValueStoreError;
use crate::kv::DeleteRequest;
use crate::kv::DeleteResult;
use crate::kv::ExistsRequest;
use crate::kv::ExistsResult;
use crate::kv::ReadRequest;
use crate::kv::ReadResult;
use crate::kv::WriteCommand;
use crate::kv::WriteRequest;
use crate::kv::WriteResult;
use crate::kv::validate_write_command;
use crate::time::now_unix_ms;
use crate::traits::KeyValueStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// Unix-ms deadline; `None` means no expiry.
    deadline_ms: Option<u64>,
}

impl Entry {
    fn new(value: String, ttl_ms: Option<u64>) -> Self {
        Self {
            value,
            deadline_ms: ttl_ms.map(|ttl| now_unix_ms() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        matches!(self.deadline_ms, Some(deadline) if now_unix_ms() > deadline)
    }
}

/// Purge the entry if its TTL has elapsed and return the live value.
fn live_value(inner: &mut HashMap<String, Entry>, key: &str) -> Option<String> {
    match inner.get(key) {
        Some(entry) if entry.is_expired() => {
            inner.remove(key);
            None
        }
        Some(entry) => Some(entry.value.clone()),
        None => None,
    }
}

/// In-memory deterministic implementation of [`KeyValueStore`] for testing.
///
/// Stores key-value pairs in a HashMap behind a single async mutex, which
/// makes every command atomic with respect to concurrent tasks. TTLs are
/// enforced lazily: expiry is checked against the wall clock whenever a
/// key is touched.
///
/// # Limitations
///
/// - No persistence across restarts
/// - Single-process only (no replication)
#[derive(Clone, Default)]
pub struct DeterministicKeyValueStore {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

impl DeterministicKeyValueStore {
    /// Create a new in-memory key-value store.
    ///
    /// The store starts empty. All operations are performed in memory with
    /// no persistence or replication.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl KeyValueStore for DeterministicKeyValueStore {
    async fn write(&self, request: WriteRequest) -> Result<WriteResult, KeyValueStoreError> {
        validate_write_command(&request.command)?;

        let mut inner = self.inner.lock().await;
        match request.command.clone() {
            WriteCommand::SetIfAbsent { key, value, ttl_ms } => match live_value(&mut inner, &key) {
                Some(current) => Ok(WriteResult {
                    command: Some(request.command),
                    applied: Some(false),
                    current: Some(current),
                }),
                None => {
                    inner.insert(key, Entry::new(value, ttl_ms));
                    Ok(WriteResult {
                        command: Some(request.command),
                        applied: Some(true),
                        current: None,
                    })
                }
            },
            WriteCommand::CompareAndSwap {
                key,
                expected,
                new_value,
                ttl_ms,
            } => {
                let current = live_value(&mut inner, &key);
                let condition_matches = match (&expected, &current) {
                    (None, None) => true,
                    (Some(exp), Some(cur)) => exp == cur,
                    _ => false,
                };
                if condition_matches {
                    inner.insert(key, Entry::new(new_value, ttl_ms));
                    Ok(WriteResult {
                        command: Some(request.command),
                        applied: Some(true),
                        current: None,
                    })
                } else {
                    Err(KeyValueStoreError::CompareAndSwapFailed {
                        key,
                        expected,
                        actual: current,
                    })
                }
            }
            WriteCommand::CompareAndDelete { key, expected } => {
                let current = live_value(&mut inner, &key);
                if matches!(&current, Some(cur) if cur == &expected) {
                    inner.remove(&key);
                    Ok(WriteResult {
                        command: Some(request.command),
                        applied: Some(true),
                        current: None,
                    })
                } else {
                    Err(KeyValueStoreError::CompareAndSwapFailed {
                        key,
                        expected: Some(expected),
                        actual: current,
                    })
                }
            }
            WriteCommand::Expire { key, ttl_ms } => {
                let applied = match live_value(&mut inner, &key) {
                    Some(_) => {
                        if let Some(entry) = inner.get_mut(&key) {
                            entry.deadline_ms = Some(now_unix_ms() + ttl_ms);
                        }
                        true
                    }
                    None => false,
                };
                Ok(WriteResult {
                    command: Some(request.command),
                    applied: Some(applied),
                    current: None,
                })
            }
        }
    }

    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError> {
        let mut inner = self.inner.lock().await;
        match live_value(&mut inner, &request.key) {
            Some(value) => Ok(ReadResult {
                key: request.key,
                value,
            }),
            None => Err(KeyValueStoreError::NotFound { key: request.key }),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> Result<DeleteResult, KeyValueStoreError> {
        let mut inner = self.inner.lock().await;
        // An expired entry must not count as removed.
        let removed = match live_value(&mut inner, &request.key) {
            Some(_) => {
                inner.remove(&request.key);
                1
            }
            None => 0,
        };
        Ok(DeleteResult {
            key: request.key,
            removed,
        })
    }

    async fn exists(&self, request: ExistsRequest) -> Result<ExistsResult, KeyValueStoreError> {
        let mut inner = self.inner.lock().await;
        let exists = live_value(&mut inner, &request.key).is_some();
        Ok(ExistsResult {
            key: request.key,
            exists,
        })
    }
}
