//! Coordination primitives over a shared key-value store.
//!
//! Two primitives for fleets of stateless service instances that share
//! nothing but a key-value store:
//!
//! - [`TokenGuard`]: single-use idempotency tokens. Issue a token, embed
//!   it in a request, and consume it exactly once on the handler side;
//!   retries and duplicate deliveries of the same request are rejected.
//! - [`DistributedLock`]: lease-based mutual exclusion over named
//!   resources, with bounded and cancellable acquisition, owner-checked
//!   release, and lease renewal.
//!
//! Both work against any [`turnstile_core::KeyValueStore`]; correctness
//! rests only on the store's atomic set-if-absent, conditional
//! delete/swap, and TTL expiry.
//!
//! Leases mean locks can be *lost*: a holder delayed past its lease may
//! overlap with the next owner. See the [`lock`] module docs for how the
//! owner checks bound (but do not eliminate) that hazard.

pub mod error;
pub mod lock;
pub mod token;
pub mod types;

pub use error::GuardError;
pub use error::LockError;
pub use lock::DistributedLock;
pub use lock::LockConfig;
pub use token::TokenGuard;
pub use token::TokenGuardConfig;
pub use types::LOCK_KEY_PREFIX;
pub use types::LockEntry;
pub use types::LockHandle;
pub use types::TOKEN_KEY_PREFIX;
pub use types::generate_token;
pub use types::lock_key;
pub use types::token_key;
