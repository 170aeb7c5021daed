//! Error types for the coordination primitives.
//!
//! Every failure is a typed result surfaced to the immediate caller; none
//! are silently absorbed. A store timeout or failure always maps to the
//! `StoreUnavailable` variant of the relevant enum: the outcome of the
//! operation is unknown and must never be interpreted as success.

use snafu::Snafu;
use turnstile_core::KeyValueStoreError;

/// Errors from the single-use token guard.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GuardError {
    /// No token was presented with the request.
    #[snafu(display("no idempotency token presented"))]
    MissingToken,

    /// The token was never issued, was already consumed, or its TTL
    /// elapsed; the store cannot tell these apart.
    #[snafu(display("token '{token}' is unknown or expired"))]
    UnknownOrExpiredToken {
        /// The rejected candidate token.
        token: String,
    },

    /// A concurrent caller consumed the token between our existence check
    /// and our delete.
    #[snafu(display("token '{token}' was consumed by a concurrent request"))]
    ConcurrentConsumption {
        /// The token that lost the race.
        token: String,
    },

    /// The store failed or timed out; the outcome is unknown.
    #[snafu(context(false))]
    #[snafu(display("store unavailable: {source}"))]
    StoreUnavailable {
        /// The underlying store error.
        source: KeyValueStoreError,
    },
}

/// Errors from the distributed lock.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LockError {
    /// The lock stayed held by others for the whole wait window.
    #[snafu(display("timed out after {waited_ms}ms acquiring lock '{key}'"))]
    AcquireTimeout {
        /// The contested lock key.
        key: String,
        /// How long we waited before giving up.
        waited_ms: u64,
    },

    /// The stored lock record is not the one this handle wrote: the handle
    /// was already released, or its lease expired and another owner took
    /// the lock.
    #[snafu(display("lock '{key}' is not held by this handle (current holder: {holder:?})"))]
    NotOwner {
        /// The lock key.
        key: String,
        /// Who holds the lock now, when the stored record was parseable.
        holder: Option<String>,
    },

    /// An unbounded acquisition was cancelled by the caller.
    #[snafu(display("acquisition of lock '{key}' was cancelled"))]
    InterruptedAcquire {
        /// The lock key.
        key: String,
    },

    /// The store failed or timed out; the outcome is unknown.
    #[snafu(context(false))]
    #[snafu(display("store unavailable: {source}"))]
    StoreUnavailable {
        /// The underlying store error.
        source: KeyValueStoreError,
    },
}
