//! Shared types for the coordination primitives.

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use turnstile_core::now_unix_ms;

/// Namespace prefix for idempotency token keys.
pub const TOKEN_KEY_PREFIX: &str = "guard/token/";

/// Namespace prefix for lock keys.
pub const LOCK_KEY_PREFIX: &str = "lock/";

/// Build the store key for an idempotency token.
pub fn token_key(token: &str) -> String {
    format!("{TOKEN_KEY_PREFIX}{token}")
}

/// Build the store key for a named lock.
pub fn lock_key(name: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{name}")
}

/// Generate a fresh opaque token: 128 random bits as 32 lowercase hex
/// characters. Collisions are negligible at this entropy.
pub fn generate_token() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}

/// Lock record stored in the KV store.
///
/// Serialized as JSON for human readability and debugging. The store's
/// TTL carries the lease; the JSON body exists for diagnostics and for
/// the value comparison that makes release owner-checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockEntry {
    /// Unique identifier of the lock holder.
    pub owner_id: String,
    /// When the lock was acquired (Unix timestamp milliseconds).
    pub acquired_at_ms: u64,
    /// Lease duration in milliseconds.
    pub lease_ms: u64,
    /// Deadline = acquired_at_ms + lease_ms.
    pub deadline_ms: u64,
}

impl LockEntry {
    /// Create a new lock entry with a lease starting now.
    pub fn new(owner_id: String, lease_ms: u64) -> Self {
        let acquired_at_ms = now_unix_ms();
        Self {
            owner_id,
            acquired_at_ms,
            lease_ms,
            deadline_ms: acquired_at_ms + lease_ms,
        }
    }

    /// Check if this entry's lease has elapsed.
    pub fn is_expired(&self) -> bool {
        now_unix_ms() > self.deadline_ms
    }

    /// Get remaining lease in milliseconds (0 if expired).
    pub fn remaining_lease_ms(&self) -> u64 {
        self.deadline_ms.saturating_sub(now_unix_ms())
    }

    /// Serialize to the exact JSON string stored under the lock key.
    ///
    /// The produced string is retained in the [`LockHandle`] and must match
    /// byte-for-byte in the conditional release/renew writes, so entries are
    /// always rendered through this one function.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "owner_id": self.owner_id,
            "acquired_at_ms": self.acquired_at_ms,
            "lease_ms": self.lease_ms,
            "deadline_ms": self.deadline_ms,
        })
        .to_string()
    }
}

/// Local proof of lock acquisition, required to release.
///
/// Holding a handle is not authoritative: the lease may have expired and
/// the lock may have been reacquired by another owner. Only the store
/// knows; `release` and `renew` find out via conditional writes.
#[derive(Debug, Clone)]
pub struct LockHandle {
    pub(crate) key: String,
    pub(crate) owner_id: String,
    pub(crate) lease_ms: u64,
    pub(crate) deadline_ms: u64,
    /// Exact JSON written to the store; the expected value for
    /// conditional release/renew.
    pub(crate) entry_json: String,
}

impl LockHandle {
    /// Get the lock key this handle was acquired for.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the owner identity that acquired the lock.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Get the lease deadline in Unix milliseconds.
    ///
    /// The lock expires at this time unless renewed.
    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }
}
