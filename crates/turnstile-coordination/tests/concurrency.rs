//! Concurrency tests: the winner-picking guarantees under real task races.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use turnstile_coordination::DistributedLock;
use turnstile_coordination::GuardError;
use turnstile_coordination::LockConfig;
use turnstile_coordination::LockError;
use turnstile_coordination::TokenGuard;
use turnstile_coordination::TokenGuardConfig;
use turnstile_core::DeterministicKeyValueStore;

const CONSUMERS: usize = 16;
const LOCK_WORKERS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumption_admits_exactly_one() {
    let store = DeterministicKeyValueStore::new();
    let guard = Arc::new(TokenGuard::new(store, TokenGuardConfig::default()));

    let token = guard.issue().await.unwrap();

    let mut tasks = Vec::with_capacity(CONSUMERS);
    for _ in 0..CONSUMERS {
        let guard = guard.clone();
        let token = token.clone();
        tasks.push(tokio::spawn(async move { guard.consume(&token).await }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => winners += 1,
            Err(GuardError::ConcurrentConsumption { .. }) => {}
            Err(GuardError::UnknownOrExpiredToken { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1, "exactly one consumer may win");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lock_admits_one_holder_at_a_time() {
    let store = DeterministicKeyValueStore::new();
    let in_section = Arc::new(AtomicU64::new(0));

    let mut tasks = Vec::with_capacity(LOCK_WORKERS);
    for worker in 0..LOCK_WORKERS {
        let store = store.clone();
        let in_section = in_section.clone();
        tasks.push(tokio::spawn(async move {
            let lock = DistributedLock::new(store, format!("worker-{worker}"), LockConfig::default());
            let handle = lock.acquire("shared", Duration::from_secs(10)).await.unwrap();

            let others = in_section.fetch_add(1, Ordering::SeqCst);
            assert_eq!(others, 0, "mutual exclusion violated");
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_section.fetch_sub(1, Ordering::SeqCst);

            lock.release(&handle).await.unwrap();
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_unbounded_acquire_is_interrupted() {
    let store = DeterministicKeyValueStore::new();
    let holder = DistributedLock::new(store.clone(), "holder", LockConfig::default());
    let _held = holder.try_acquire("busy").await.unwrap();

    let cancel = CancellationToken::new();
    let waiter_cancel = cancel.clone();
    let waiter = tokio::spawn(async move {
        let lock = DistributedLock::new(store, "waiter", LockConfig::default());
        lock.acquire_until_cancelled("busy", 60_000, &waiter_cancel).await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = waiter.await.unwrap();
    match result {
        Err(LockError::InterruptedAcquire { key }) => assert_eq!(key, "busy"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn contending_waiters_all_eventually_hold_the_lock() {
    let store = DeterministicKeyValueStore::new();
    let acquisitions = Arc::new(AtomicU64::new(0));

    let mut tasks = Vec::with_capacity(LOCK_WORKERS);
    for worker in 0..LOCK_WORKERS {
        let store = store.clone();
        let acquisitions = acquisitions.clone();
        tasks.push(tokio::spawn(async move {
            let lock = DistributedLock::new(store, format!("node-{worker}"), LockConfig::default());
            let handle = lock.acquire("queue", Duration::from_secs(10)).await.unwrap();
            acquisitions.fetch_add(1, Ordering::SeqCst);
            lock.release(&handle).await.unwrap();
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(acquisitions.load(Ordering::SeqCst), LOCK_WORKERS as u64);
}
