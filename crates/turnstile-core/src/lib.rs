//! Store contract and foundational types for the turnstile primitives.
//!
//! This crate defines the minimum key-value store capability set that the
//! coordination primitives in `turnstile-coordination` are built on:
//! atomic conditional writes (`SetIfAbsent`, `CompareAndSwap`,
//! `CompareAndDelete`), an atomic delete that reports the affected count,
//! existence checks, and per-key TTL.
//!
//! # Key Components
//!
//! - **Traits**: [`KeyValueStore`]
//! - **Types**: `WriteCommand`, `WriteRequest`, `ReadRequest`, `DeleteResult`, etc.
//! - **Constants**: fixed size limits applied before any command reaches a backend
//! - **Testing**: [`DeterministicKeyValueStore`], an in-memory TTL-enforcing backend

pub mod constants;
pub mod error;
pub mod inmemory;
pub mod kv;
pub mod time;
pub mod traits;

// Re-export all public types at crate root for convenience

// Constants
pub use constants::DEFAULT_GUARD_TTL_MS;
pub use constants::DEFAULT_LOCK_LEASE_MS;
pub use constants::LOCK_RETRY_INITIAL_BACKOFF_MS;
pub use constants::LOCK_RETRY_MAX_BACKOFF_MS;
pub use constants::MAX_KEY_SIZE;
pub use constants::MAX_VALUE_SIZE;
// Error types
pub use error::KeyValueStoreError;
// In-memory deterministic implementation for testing
pub use inmemory::DeterministicKeyValueStore;
// KV types
pub use kv::DeleteRequest;
pub use kv::DeleteResult;
pub use kv::ExistsRequest;
pub use kv::ExistsResult;
pub use kv::ReadRequest;
pub use kv::ReadResult;
pub use kv::WriteCommand;
pub use kv::WriteRequest;
pub use kv::WriteResult;
pub use kv::validate_write_command;
// Time helpers
pub use time::now_unix_ms;
// Traits
pub use traits::KeyValueStore;
