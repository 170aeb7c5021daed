//! Distributed lock with lease-based expiry.
//!
//! Provides mutual exclusion across independent process instances with:
//! - Atomic set-if-absent acquisition against the shared store
//! - Lease (TTL) based automatic expiry for crash recovery
//! - Owner-checked release via compare-and-delete
//! - Exponential backoff with jitter between acquisition attempts
//!
//! ## The "lost lock" hazard
//!
//! Lease expiry trades a liveness guarantee for a safety risk: the store
//! reclaims an abandoned lock after `lease_ms`, but a merely *delayed*
//! holder may resume believing it still holds the lock after another
//! process has reacquired it. Owner-checked [`release`](DistributedLock::release)
//! and [`renew`](DistributedLock::renew) detect the loss after the fact;
//! they cannot prevent the overlap. Size leases well above the worst-case
//! critical section, and keep critical sections short.
//!
//! No fairness is guaranteed among simultaneous waiters: any waiter may
//! win a given attempt.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use turnstile_core::KeyValueStore;
use turnstile_core::KeyValueStoreError;
use turnstile_core::ReadRequest;
use turnstile_core::WriteRequest;
use turnstile_core::constants::DEFAULT_LOCK_LEASE_MS;
use turnstile_core::constants::LOCK_RETRY_INITIAL_BACKOFF_MS;
use turnstile_core::constants::LOCK_RETRY_MAX_BACKOFF_MS;

use crate::error::AcquireTimeoutSnafu;
use crate::error::InterruptedAcquireSnafu;
use crate::error::LockError;
use crate::error::NotOwnerSnafu;
use crate::types::LockEntry;
use crate::types::LockHandle;
use crate::types::lock_key;

/// Configuration for the distributed lock.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Lease duration in milliseconds; the store reclaims the lock this
    /// long after acquisition unless it is renewed or released.
    pub lease_ms: u64,
    /// Initial backoff between acquisition attempts in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff between acquisition attempts in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease_ms: DEFAULT_LOCK_LEASE_MS,
            initial_backoff_ms: LOCK_RETRY_INITIAL_BACKOFF_MS,
            max_backoff_ms: LOCK_RETRY_MAX_BACKOFF_MS,
        }
    }
}

/// A distributed mutex over a named resource.
///
/// Every variant of acquisition is a configuration preset over one
/// algorithm: attempt an atomic `SetIfAbsent` of the lock record with the
/// lease as TTL, and on contention back off and retry until the wait
/// budget is spent. The lock key is an explicit parameter of every
/// operation; one `DistributedLock` value can guard any number of
/// resources on behalf of its owner identity.
pub struct DistributedLock<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    owner_id: String,
    config: LockConfig,
}

fn parse_owner(json: &str) -> Option<String> {
    serde_json::from_str::<LockEntry>(json).ok().map(|entry| entry.owner_id)
}

impl<S: KeyValueStore + ?Sized> DistributedLock<S> {
    /// Create a new lock client.
    ///
    /// # Arguments
    /// * `store` - The underlying key-value store
    /// * `owner_id` - Unique identity of this holder (unique per process
    ///   instance at minimum)
    /// * `config` - Lease and backoff configuration
    pub fn new(store: Arc<S>, owner_id: impl Into<String>, config: LockConfig) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
            config,
        }
    }

    /// Get the owner identity this client acquires locks as.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Try to acquire the lock without waiting, with the default lease.
    pub async fn try_acquire(&self, key: &str) -> Result<LockHandle, LockError> {
        self.acquire_inner(key, Some(Duration::ZERO), self.config.lease_ms, None).await
    }

    /// Try to acquire the lock without waiting, with an explicit lease.
    pub async fn try_acquire_with(&self, key: &str, lease_ms: u64) -> Result<LockHandle, LockError> {
        self.acquire_inner(key, Some(Duration::ZERO), lease_ms, None).await
    }

    /// Acquire the lock, waiting up to `wait_timeout`, with the default lease.
    ///
    /// Fails with [`LockError::AcquireTimeout`] if the lock stayed held
    /// for the whole wait window. `Duration::ZERO` makes this a
    /// non-blocking try.
    pub async fn acquire(&self, key: &str, wait_timeout: Duration) -> Result<LockHandle, LockError> {
        self.acquire_inner(key, Some(wait_timeout), self.config.lease_ms, None).await
    }

    /// Acquire the lock, waiting up to `wait_timeout`, with an explicit lease.
    pub async fn acquire_with(&self, key: &str, wait_timeout: Duration, lease_ms: u64) -> Result<LockHandle, LockError> {
        self.acquire_inner(key, Some(wait_timeout), lease_ms, None).await
    }

    /// Acquire the lock with no wait bound, retrying until `cancel` fires.
    ///
    /// Cancellation surfaces as [`LockError::InterruptedAcquire`]. This is
    /// the only way an unbounded acquisition terminates without the lock.
    pub async fn acquire_until_cancelled(
        &self,
        key: &str,
        lease_ms: u64,
        cancel: &CancellationToken,
    ) -> Result<LockHandle, LockError> {
        self.acquire_inner(key, None, lease_ms, Some(cancel)).await
    }

    /// Release a previously acquired lock.
    ///
    /// Deletes the lock key only if it still holds the exact record this
    /// handle wrote (compare-and-delete). Fails with
    /// [`LockError::NotOwner`] when it does not: the handle was already
    /// released, or its lease expired and the lock was reacquired. A
    /// failed release never disturbs another owner's record, so calling
    /// release twice is safe.
    pub async fn release(&self, handle: &LockHandle) -> Result<(), LockError> {
        let request = WriteRequest::compare_and_delete(lock_key(&handle.key), handle.entry_json.clone());
        match self.store.write(request).await {
            Ok(_) => {
                debug!(key = %handle.key, owner = %handle.owner_id, "lock released");
                Ok(())
            }
            Err(KeyValueStoreError::CompareAndSwapFailed { actual, .. }) => {
                let holder = actual.as_deref().and_then(parse_owner);
                warn!(
                    key = %handle.key,
                    owner = %handle.owner_id,
                    holder = ?holder,
                    "release rejected: stored record is not ours"
                );
                NotOwnerSnafu {
                    key: &handle.key,
                    holder,
                }
                .fail()
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Extend the lease of a held lock by its original duration.
    ///
    /// Atomically replaces the stored record (and resets its TTL) only if
    /// it is still the one this handle wrote. Fails with
    /// [`LockError::NotOwner`] when the lease was lost. On success the
    /// handle is updated to match the new record.
    pub async fn renew(&self, handle: &mut LockHandle) -> Result<(), LockError> {
        let renewed = LockEntry::new(handle.owner_id.clone(), handle.lease_ms);
        let new_json = renewed.to_json();
        let request = WriteRequest::compare_and_swap(
            lock_key(&handle.key),
            Some(handle.entry_json.clone()),
            new_json.clone(),
            Some(handle.lease_ms),
        );
        match self.store.write(request).await {
            Ok(_) => {
                handle.entry_json = new_json;
                handle.deadline_ms = renewed.deadline_ms;
                debug!(
                    key = %handle.key,
                    owner = %handle.owner_id,
                    deadline_ms = renewed.deadline_ms,
                    "lease renewed"
                );
                Ok(())
            }
            Err(KeyValueStoreError::CompareAndSwapFailed { actual, .. }) => {
                let holder = actual.as_deref().and_then(parse_owner);
                warn!(
                    key = %handle.key,
                    owner = %handle.owner_id,
                    holder = ?holder,
                    "renew rejected: lease lost"
                );
                NotOwnerSnafu {
                    key: &handle.key,
                    holder,
                }
                .fail()
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the current holder of a lock, if any.
    ///
    /// Returns `None` when the lock is free, the lease has elapsed, or
    /// the stored record is unparseable. The answer is a snapshot and may
    /// be stale by the time the caller acts on it.
    pub async fn status(&self, key: &str) -> Result<Option<LockEntry>, LockError> {
        match self.store.read(ReadRequest::new(lock_key(key))).await {
            Ok(result) => match serde_json::from_str::<LockEntry>(&result.value) {
                Ok(entry) if entry.is_expired() => Ok(None),
                Ok(entry) => Ok(Some(entry)),
                Err(_) => {
                    warn!(key = %key, "unparseable lock record");
                    Ok(None)
                }
            },
            Err(KeyValueStoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// One atomic acquisition attempt.
    ///
    /// Returns `Ok(None)` when the lock is currently held by someone else.
    async fn attempt(&self, key: &str, lease_ms: u64) -> Result<Option<LockHandle>, LockError> {
        let entry = LockEntry::new(self.owner_id.clone(), lease_ms);
        let entry_json = entry.to_json();

        let request = WriteRequest::set_if_absent(lock_key(key), entry_json.clone(), Some(lease_ms));
        let result = self.store.write(request).await?;

        if result.applied == Some(true) {
            debug!(key = %key, owner = %self.owner_id, lease_ms, "lock acquired");
            return Ok(Some(LockHandle {
                key: key.to_string(),
                owner_id: self.owner_id.clone(),
                lease_ms,
                deadline_ms: entry.deadline_ms,
                entry_json,
            }));
        }

        let holder = result.current.as_deref().and_then(parse_owner);
        debug!(key = %key, holder = ?holder, "lock held by another owner");
        Ok(None)
    }

    /// The single acquire algorithm behind every public preset.
    async fn acquire_inner(
        &self,
        key: &str,
        wait: Option<Duration>,
        lease_ms: u64,
        cancel: Option<&CancellationToken>,
    ) -> Result<LockHandle, LockError> {
        let started = Instant::now();
        let mut backoff_ms = self.config.initial_backoff_ms;

        loop {
            if let Some(cancel) = cancel {
                if cancel.is_cancelled() {
                    return InterruptedAcquireSnafu { key }.fail();
                }
            }

            if let Some(handle) = self.attempt(key, lease_ms).await? {
                return Ok(handle);
            }

            if let Some(wait) = wait {
                if started.elapsed() >= wait {
                    return AcquireTimeoutSnafu {
                        key,
                        waited_ms: started.elapsed().as_millis() as u64,
                    }
                    .fail();
                }
            }

            // Jitter spreads simultaneous waiters. The rng is created per
            // iteration to avoid holding a non-Send type across an await.
            let jitter = rand::rng().random_range(0..backoff_ms / 2 + 1);
            let mut sleep_ms = backoff_ms + jitter;
            if let Some(wait) = wait {
                // Never sleep meaningfully past the wait deadline.
                let remaining = wait.saturating_sub(started.elapsed());
                sleep_ms = sleep_ms.min(remaining.as_millis() as u64 + 1);
            }

            debug!(key = %key, owner = %self.owner_id, backoff_ms = sleep_ms, "lock held, backing off");

            match cancel {
                Some(cancel) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return InterruptedAcquireSnafu { key }.fail(),
                        _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
                    }
                }
                None => tokio::time::sleep(Duration::from_millis(sleep_ms)).await,
            }

            backoff_ms = (backoff_ms * 2).min(self.config.max_backoff_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use turnstile_core::DeterministicKeyValueStore;

    use super::*;

    fn short_lease_config() -> LockConfig {
        LockConfig {
            lease_ms: 40,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn acquire_and_release_round_trip() {
        let store = DeterministicKeyValueStore::new();
        let lock = DistributedLock::new(store, "node-a", LockConfig::default());

        let handle = lock.try_acquire("job").await.unwrap();
        assert_eq!(handle.key(), "job");
        assert_eq!(handle.owner_id(), "node-a");
        assert!(handle.deadline_ms() > 0);

        lock.release(&handle).await.unwrap();

        // Immediately reacquirable after release.
        let again = lock.try_acquire("job").await.unwrap();
        lock.release(&again).await.unwrap();
    }

    #[tokio::test]
    async fn non_blocking_try_fails_immediately_while_held() {
        let store = DeterministicKeyValueStore::new();
        let alpha = DistributedLock::new(store.clone(), "node-a", LockConfig::default());
        let beta = DistributedLock::new(store, "node-b", LockConfig::default());

        let _held = alpha.acquire_with("resource:42", Duration::ZERO, 60_000).await.unwrap();

        let started = Instant::now();
        let result = beta.acquire_with("resource:42", Duration::ZERO, 60_000).await;
        assert!(matches!(result, Err(LockError::AcquireTimeout { .. })));
        // Non-blocking: no backoff sleep happened.
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn bounded_acquire_times_out_against_a_holder() {
        let store = DeterministicKeyValueStore::new();
        let alpha = DistributedLock::new(store.clone(), "node-a", LockConfig::default());
        let beta = DistributedLock::new(store, "node-b", LockConfig::default());

        let _held = alpha.try_acquire("job").await.unwrap();

        let started = Instant::now();
        let result = beta.acquire("job", Duration::from_millis(100)).await;
        match result {
            Err(LockError::AcquireTimeout { key, waited_ms }) => {
                assert_eq!(key, "job");
                assert!(waited_ms >= 100);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn bounded_acquire_succeeds_once_released() {
        let store = DeterministicKeyValueStore::new();
        let alpha = Arc::new(DistributedLock::new(store.clone(), "node-a", LockConfig::default()));
        let beta = DistributedLock::new(store, "node-b", LockConfig::default());

        let handle = alpha.try_acquire("job").await.unwrap();

        let releaser = alpha.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            releaser.release(&handle).await.unwrap();
        });

        let taken = beta.acquire("job", Duration::from_secs(2)).await.unwrap();
        assert_eq!(taken.owner_id(), "node-b");
    }

    #[tokio::test]
    async fn release_twice_is_not_owner() {
        let store = DeterministicKeyValueStore::new();
        let lock = DistributedLock::new(store, "node-a", LockConfig::default());

        let handle = lock.try_acquire("job").await.unwrap();
        lock.release(&handle).await.unwrap();

        let second = lock.release(&handle).await;
        assert!(matches!(second, Err(LockError::NotOwner { .. })));
    }

    #[tokio::test]
    async fn stale_release_spares_the_new_owner() {
        let store = DeterministicKeyValueStore::new();
        let alpha = DistributedLock::new(store.clone(), "node-a", short_lease_config());
        let beta = DistributedLock::new(store, "node-b", LockConfig::default());

        let stale = alpha.try_acquire("job").await.unwrap();

        // Let the lease lapse, then hand the lock to a new owner.
        tokio::time::sleep(Duration::from_millis(80)).await;
        let _current = beta.try_acquire("job").await.unwrap();

        let result = alpha.release(&stale).await;
        match result {
            Err(LockError::NotOwner { holder, .. }) => {
                assert_eq!(holder.as_deref(), Some("node-b"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        // The new owner's record survived the stale release.
        let status = alpha.status("job").await.unwrap().unwrap();
        assert_eq!(status.owner_id, "node-b");
    }

    #[tokio::test]
    async fn expired_lock_is_reacquirable() {
        let store = DeterministicKeyValueStore::new();
        let alpha = DistributedLock::new(store.clone(), "node-a", short_lease_config());
        let beta = DistributedLock::new(store, "node-b", LockConfig::default());

        let _abandoned = alpha.try_acquire("job").await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        let taken = beta.try_acquire("job").await.unwrap();
        assert_eq!(taken.owner_id(), "node-b");
    }

    #[tokio::test]
    async fn renew_extends_the_lease() {
        let store = DeterministicKeyValueStore::new();
        let lock = DistributedLock::new(store, "node-a", LockConfig::default());

        let mut handle = lock.try_acquire_with("job", 10_000).await.unwrap();
        let before = handle.deadline_ms();

        tokio::time::sleep(Duration::from_millis(20)).await;
        lock.renew(&mut handle).await.unwrap();
        assert!(handle.deadline_ms() >= before);

        // The renewed record is the one release must match.
        lock.release(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn renew_after_lease_loss_is_not_owner() {
        let store = DeterministicKeyValueStore::new();
        let alpha = DistributedLock::new(store.clone(), "node-a", short_lease_config());
        let beta = DistributedLock::new(store, "node-b", LockConfig::default());

        let mut lost = alpha.try_acquire("job").await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let _current = beta.try_acquire("job").await.unwrap();

        let result = alpha.renew(&mut lost).await;
        assert!(matches!(result, Err(LockError::NotOwner { .. })));
    }

    #[tokio::test]
    async fn status_reports_holder_and_freedom() {
        let store = DeterministicKeyValueStore::new();
        let lock = DistributedLock::new(store, "node-a", LockConfig::default());

        assert!(lock.status("job").await.unwrap().is_none());

        let handle = lock.try_acquire("job").await.unwrap();
        let entry = lock.status("job").await.unwrap().unwrap();
        assert_eq!(entry.owner_id, "node-a");
        assert!(!entry.is_expired());

        lock.release(&handle).await.unwrap();
        assert!(lock.status("job").await.unwrap().is_none());
    }
}
