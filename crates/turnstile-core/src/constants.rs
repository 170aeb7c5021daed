//! Public API constants for turnstile operations.
//!
//! Constants are fixed and immutable, enforced at compile time. Each limit
//! has explicit bounds to prevent unbounded resource allocation.

// ============================================================================
// Key-Value Size Limits
// ============================================================================

/// Maximum size of a single key in bytes (1 KB).
///
/// Applied to all write operations before they reach a backend.
pub const MAX_KEY_SIZE: u32 = 1024;

/// Maximum size of a single value in bytes (1 MB).
///
/// Applied to all write operations before they reach a backend.
pub const MAX_VALUE_SIZE: u32 = 1024 * 1024;

// ============================================================================
// Coordination Defaults
// ============================================================================

/// Default time-to-live for an idempotency token in milliseconds (10 s).
///
/// A token not consumed within this window expires and any later replay of
/// the request it guarded is rejected as unknown.
pub const DEFAULT_GUARD_TTL_MS: u64 = 10_000;

/// Default lease for a distributed lock in milliseconds (60 s).
///
/// An abandoned lock is reclaimed by the store's TTL after this long.
pub const DEFAULT_LOCK_LEASE_MS: u64 = 60_000;

/// Initial backoff between lock acquisition attempts in milliseconds.
pub const LOCK_RETRY_INITIAL_BACKOFF_MS: u64 = 10;

/// Maximum backoff between lock acquisition attempts in milliseconds.
pub const LOCK_RETRY_MAX_BACKOFF_MS: u64 = 1_000;
