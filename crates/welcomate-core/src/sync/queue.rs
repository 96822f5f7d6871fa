//! Bounded FIFO of operations awaiting transmission to the remote store.
//!
//! At most one batch is in flight at a time: [`BatchSyncQueue::try_begin`]
//! is a compare-and-set on an atomic flag, and a second trigger while a batch
//! runs is dropped rather than queued. Anything enqueued meanwhile is picked
//! up by the next run.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::cache::OperationCache;
use super::operation::{OperationKind, SyncOperation};
use super::result::SyncResult;
use crate::config::SyncConfig;
use crate::remote::AdminService;

/// Outcome of dispatching one batch
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<(SyncOperation, SyncResult)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, result)| result.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Clears the in-flight flag when dropped.
pub struct BatchGuard {
    queue: Arc<BatchSyncQueue>,
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.queue.syncing.store(false, Ordering::Release);
    }
}

pub struct BatchSyncQueue {
    pending: Mutex<VecDeque<SyncOperation>>,
    cache: Arc<OperationCache>,
    capacity: usize,
    call_timeout: Duration,
    syncing: AtomicBool,
    verbose: bool,
}

impl BatchSyncQueue {
    pub fn new(cache: Arc<OperationCache>, capacity: usize, call_timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            cache,
            capacity: capacity.max(1),
            call_timeout,
            syncing: AtomicBool::new(false),
            verbose: false,
        }
    }

    pub fn from_config(cache: Arc<OperationCache>, config: &SyncConfig) -> Self {
        Self {
            verbose: config.debug_logging,
            ..Self::new(cache, config.queue_capacity, config.call_timeout())
        }
    }

    /// Queue an operation for the next batch.
    ///
    /// Returns `false` when the operation was skipped: the cache already holds
    /// a successful outcome covering it, a newer operation with the same key
    /// is pending, or the queue is full. Otherwise an operation whose key is
    /// already pending replaces the pending payload in place.
    pub fn enqueue(&self, operation: SyncOperation) -> bool {
        if self.cache.has_success(&operation) {
            if self.verbose {
                tracing::debug!("Operation cached, skipping: {operation}");
            }
            return false;
        }

        let mut pending = self.pending.lock();
        let key = operation.key();
        if let Some(existing) = pending.iter_mut().find(|queued| queued.key() == key) {
            if existing.is_newer_than(&operation) {
                if self.verbose {
                    tracing::debug!("Newer operation already pending, skipping: {operation}");
                }
                return false;
            }
            if self.verbose {
                tracing::debug!("Operation already pending, replacing payload: {operation}");
            }
            *existing = operation;
            return true;
        }

        if pending.len() >= self.capacity {
            tracing::warn!(
                "Sync queue full ({} operations), dropping: {operation}",
                self.capacity
            );
            return false;
        }

        pending.push_back(operation);
        if self.verbose {
            tracing::debug!("Added operation to queue, queue size: {}", pending.len());
        }
        true
    }

    /// Remove and return up to `max` operations in FIFO order.
    ///
    /// Operations already confirmed by a cached success are discarded.
    pub fn drain(&self, max: usize) -> Vec<SyncOperation> {
        let mut pending = self.pending.lock();
        let mut batch = Vec::with_capacity(max.min(pending.len()));

        while batch.len() < max {
            let Some(operation) = pending.pop_front() else {
                break;
            };
            if self.cache.has_success(&operation) {
                if self.verbose {
                    tracing::debug!("Dropping already-synced operation: {operation}");
                }
                continue;
            }
            batch.push(operation);
        }

        if self.verbose {
            tracing::debug!("Collected {} operations for batch sync", batch.len());
        }
        batch
    }

    /// Put back operations that could not be sent at all.
    ///
    /// Anything superseded by a newer pending operation is dropped.
    pub fn requeue(&self, operations: Vec<SyncOperation>) {
        for operation in operations {
            self.enqueue(operation);
        }
    }

    /// Send each operation, cache its outcome and re-queue transient failures.
    pub async fn dispatch(
        &self,
        remote: &dyn AdminService,
        operations: Vec<SyncOperation>,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for operation in operations {
            let result = self.execute(remote, &operation).await;
            self.cache.record(&operation, result);

            if self.verbose {
                tracing::debug!("Operation result: {} -> {result}", operation.kind());
            }
            if result.should_retry() {
                self.enqueue(operation.clone());
            }
            report.outcomes.push((operation, result));
        }

        tracing::info!(
            "Batch sync completed: {} success, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    /// Invoke the remote call matching one operation and classify the outcome.
    pub async fn execute(&self, remote: &dyn AdminService, operation: &SyncOperation) -> SyncResult {
        tokio::time::timeout(self.call_timeout, call_remote(remote, operation))
            .await
            .unwrap_or(SyncResult::Timeout)
    }

    /// Claim the single in-flight batch slot.
    pub fn try_begin(self: &Arc<Self>) -> Option<BatchGuard> {
        self.syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BatchGuard {
                queue: Arc::clone(self),
            })
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
        tracing::debug!("Cleared all pending operations");
    }
}

async fn call_remote(remote: &dyn AdminService, operation: &SyncOperation) -> SyncResult {
    let username = operation.username();
    match operation.kind() {
        OperationKind::Register => {
            let (Some(account), Some(password)) = (operation.account(), operation.password())
            else {
                return SyncResult::InvalidData;
            };
            match remote.register_user(username, account, password).await {
                Ok(true) => SyncResult::Success,
                Ok(false) => SyncResult::AlreadyExists,
                Err(error) => SyncResult::from(&error),
            }
        }
        OperationKind::UpdatePassword => {
            let Some(password) = operation.password() else {
                return SyncResult::InvalidData;
            };
            remote
                .update_user_password(username, password)
                .await
                .map_or_else(|error| SyncResult::from(&error), |()| SyncResult::Success)
        }
        OperationKind::DeleteUser => remote
            .delete_user(username)
            .await
            .map_or_else(|error| SyncResult::from(&error), |()| SyncResult::Success),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use crate::testing::FakeAdminService;
    use pretty_assertions::assert_eq;

    fn queue() -> Arc<BatchSyncQueue> {
        let cache = Arc::new(OperationCache::new(Duration::from_secs(30), true));
        Arc::new(BatchSyncQueue::new(cache, 8, Duration::from_millis(200)))
    }

    #[test]
    fn drain_is_fifo_and_bounded() {
        let queue = queue();
        for name in ["a", "b", "c"] {
            assert!(queue.enqueue(SyncOperation::delete_user(name)));
        }

        let first = queue.drain(2);
        let names: Vec<_> = first.iter().map(SyncOperation::username).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.drain(10)[0].username(), "c");
        assert!(queue.drain(10).is_empty());
    }

    #[test]
    fn duplicate_enqueue_keeps_one_entry_with_latest_payload() {
        let queue = queue();
        queue.enqueue(SyncOperation::update_password("alice", "p1"));
        queue.enqueue(SyncOperation::delete_user("bob"));
        queue.enqueue(SyncOperation::update_password("alice", "p2"));

        let batch = queue.drain(10);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].username(), "alice");
        assert_eq!(batch[0].password(), Some("p2"));
    }

    #[test]
    fn enqueue_skips_cached_success() {
        let queue = queue();
        let op = SyncOperation::register("alice", "a1", "p1");
        queue.cache.record(&op, SyncResult::Success);

        assert!(!queue.enqueue(op));
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn enqueue_rejects_when_full() {
        let queue = queue();
        for i in 0..8 {
            assert!(queue.enqueue(SyncOperation::delete_user(&format!("u{i}"))));
        }
        assert!(!queue.enqueue(SyncOperation::delete_user("overflow")));
        assert_eq!(queue.pending_count(), 8);
    }

    #[test]
    fn drain_discards_operations_confirmed_after_enqueue() {
        let queue = queue();
        let op = SyncOperation::register("alice", "a1", "p1");
        queue.enqueue(op.clone());
        queue.cache.record(&op, SyncResult::Success);

        assert!(queue.drain(10).is_empty());
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn only_one_batch_guard_at_a_time() {
        let queue = queue();
        let guard = queue.try_begin().unwrap();
        assert!(queue.is_syncing());
        assert!(queue.try_begin().is_none());

        drop(guard);
        assert!(!queue.is_syncing());
        assert!(queue.try_begin().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_classifies_and_caches_outcomes() {
        let queue = queue();
        let remote = FakeAdminService::new();
        remote.seed("bob", "b1", "pw");

        let ops = vec![
            SyncOperation::register("alice", "a1", "p1"),
            SyncOperation::register("bob", "b1", "pw"),
            SyncOperation::update_password("alice", "p2"),
            SyncOperation::delete_user("bob"),
        ];
        let report = queue.dispatch(&remote, ops.clone()).await;

        let results: Vec<_> = report.outcomes.iter().map(|(_, r)| *r).collect();
        assert_eq!(
            results,
            [
                SyncResult::Success,
                SyncResult::AlreadyExists,
                SyncResult::Success,
                SyncResult::Success
            ]
        );
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 1);
        assert!(queue.cache.has_success(&ops[0]));
        assert!(queue.cache.is_cached(&ops[1]));
        assert_eq!(queue.pending_count(), 0);
        assert!(remote.has_user("a1"));
        assert!(!remote.has_user("b1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transient_failures_are_requeued() {
        let queue = queue();
        let remote = FakeAdminService::new();
        remote.fail_with(Some(RemoteError::Transport("reset".into())));

        let op = SyncOperation::register("alice", "a1", "p1");
        let report = queue.dispatch(&remote, vec![op.clone()]).await;

        assert_eq!(report.outcomes[0].1, SyncResult::NetworkError);
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.drain(1)[0].key(), op.key());
    }

    fn older_and_newer_update() -> (SyncOperation, SyncOperation) {
        let older = SyncOperation::update_password("alice", "p2");
        std::thread::sleep(Duration::from_millis(2));
        let newer = SyncOperation::update_password("alice", "p3");
        (older, newer)
    }

    #[test]
    fn older_operation_never_replaces_newer_pending_one() {
        let queue = queue();
        let (older, newer) = older_and_newer_update();
        assert!(queue.enqueue(newer));

        assert!(!queue.enqueue(older.clone()));
        queue.requeue(vec![older]);

        let batch = queue.drain(10);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].password(), Some("p3"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn retried_operation_keeps_newer_pending_payload() {
        let queue = queue();
        let remote = FakeAdminService::new();
        remote.seed("alice", "a1", "p1");
        remote.fail_with(Some(RemoteError::Transport("reset".into())));

        let (older, newer) = older_and_newer_update();
        queue.enqueue(newer);
        let report = queue.dispatch(&remote, vec![older]).await;

        assert_eq!(report.outcomes[0].1, SyncResult::NetworkError);
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(queue.drain(1)[0].password(), Some("p3"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn success_for_older_payload_does_not_drop_newer_pending_one() {
        let queue = queue();
        let remote = FakeAdminService::new();
        remote.seed("alice", "a1", "p1");

        let (older, newer) = older_and_newer_update();
        queue.enqueue(newer);
        let report = queue.dispatch(&remote, vec![older]).await;
        assert_eq!(report.outcomes[0].1, SyncResult::Success);

        let batch = queue.drain(10);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].password(), Some("p3"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn permanent_failures_are_not_requeued() {
        let queue = queue();
        let remote = FakeAdminService::new();
        remote.fail_with(Some(RemoteError::PermissionDenied("admin only".into())));

        let report = queue
            .dispatch(&remote, vec![SyncOperation::delete_user("bob")])
            .await;

        assert_eq!(report.outcomes[0].1, SyncResult::PermissionDenied);
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_calls_time_out_and_retry() {
        let queue = queue();
        let remote = FakeAdminService::new();
        remote.set_delay(Duration::from_secs(5));

        let report = queue
            .dispatch(&remote, vec![SyncOperation::delete_user("bob")])
            .await;

        assert_eq!(report.outcomes[0].1, SyncResult::Timeout);
        assert_eq!(queue.pending_count(), 1);
    }
}
