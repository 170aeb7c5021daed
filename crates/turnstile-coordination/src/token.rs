//! Single-use idempotency token guard.
//!
//! Guards an operation invoked over an at-least-once transport so it is
//! accepted for execution at most once. A client first obtains a token
//! via [`TokenGuard::issue`], embeds it in the protected request, and the
//! request handler calls [`TokenGuard::consume`] before running the
//! operation. Retries and proxy re-issues present the same token, and
//! only one consumption can succeed.

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use turnstile_core::DeleteRequest;
use turnstile_core::ExistsRequest;
use turnstile_core::KeyValueStore;
use turnstile_core::WriteRequest;
use turnstile_core::constants::DEFAULT_GUARD_TTL_MS;

use crate::error::ConcurrentConsumptionSnafu;
use crate::error::GuardError;
use crate::error::MissingTokenSnafu;
use crate::error::UnknownOrExpiredTokenSnafu;
use crate::types::generate_token;
use crate::types::token_key;

/// Configuration for the token guard.
#[derive(Debug, Clone)]
pub struct TokenGuardConfig {
    /// Time-to-live of an issued token in milliseconds. A token not
    /// consumed within this window expires.
    pub ttl_ms: u64,
}

impl Default for TokenGuardConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_GUARD_TTL_MS,
        }
    }
}

/// Issues opaque single-use tokens and verifies-and-invalidates them
/// exactly once.
///
/// The store is the single source of truth: a token is live exactly while
/// its key is present. Issuance creates the key with the guard TTL;
/// successful consumption or TTL expiry destroys it, and whichever
/// happens first wins.
pub struct TokenGuard<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    config: TokenGuardConfig,
}

impl<S: KeyValueStore + ?Sized> TokenGuard<S> {
    /// Create a new token guard over the given store.
    pub fn new(store: Arc<S>, config: TokenGuardConfig) -> Self {
        Self { store, config }
    }

    /// Issue a fresh single-use token.
    ///
    /// The token is written to the store under its own (namespaced) key
    /// with the guard TTL and returned for embedding in a later
    /// idempotent request.
    pub async fn issue(&self) -> Result<String, GuardError> {
        loop {
            let token = generate_token();
            let result = self
                .store
                .write(WriteRequest::set_if_absent(
                    token_key(&token),
                    token.clone(),
                    Some(self.config.ttl_ms),
                ))
                .await?;

            if result.applied == Some(true) {
                debug!(token = %token, ttl_ms = self.config.ttl_ms, "token issued");
                return Ok(token);
            }

            // 128-bit collision with a live token; practically unreachable.
            warn!(token = %token, "token collision on issue, regenerating");
        }
    }

    /// Verify and invalidate a token, exactly once per token.
    ///
    /// For a fixed token, among any number of concurrent calls at most one
    /// succeeds; the others fail with [`GuardError::ConcurrentConsumption`]
    /// or [`GuardError::UnknownOrExpiredToken`].
    pub async fn consume(&self, candidate: &str) -> Result<(), GuardError> {
        // Rejected before any store round-trip.
        if candidate.is_empty() {
            return MissingTokenSnafu.fail();
        }

        let key = token_key(candidate);
        let exists = self.store.exists(ExistsRequest::new(key.clone())).await?;
        if !exists.exists {
            debug!(token = %candidate, "token unknown or expired");
            return UnknownOrExpiredTokenSnafu { token: candidate }.fail();
        }

        // The delete's affected count, not the existence check above, is
        // authoritative: a concurrent consumer may have removed the key in
        // between.
        let deleted = self.store.delete(DeleteRequest::new(key)).await?;
        if deleted.removed == 0 {
            warn!(token = %candidate, "token lost to a concurrent consumer");
            return ConcurrentConsumptionSnafu { token: candidate }.fail();
        }

        debug!(token = %candidate, "token consumed");
        Ok(())
    }
}
