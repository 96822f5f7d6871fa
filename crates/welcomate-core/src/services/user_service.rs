//! User operations with offline-first sync to the remote admin service.
//!
//! With a primary remote handle every mutation goes remote-first and is only
//! applied locally once the remote accepted it. Without one (or when the
//! remote call itself faults) the mutation is applied locally, queued for
//! batch sync, and pushed once more over a scoped connection. Setting a
//! primary handle triggers reconciliation: push unsynced local records, then
//! prune local records the remote no longer has.
//!
//! Remote faults never reach callers; they only see `bool` / `Option`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::broker::{BindError, ConnectionBroker};
use crate::config::SyncConfig;
use crate::remote::AdminService;
use crate::state::ConnectionState;
use crate::store::LocalStore;
use crate::sync::{BatchReport, BatchSyncQueue, OperationCache, OperationKind, SyncOperation, SyncResult};
use crate::validation::{is_valid_account, is_valid_password, is_valid_username};

/// Counters from one push-then-pull reconciliation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Unsynced records the remote accepted
    pub pushed: usize,
    /// Unsynced records the remote already had
    pub already_present: usize,
    /// Unsynced records left unsynced by a remote fault
    pub push_failures: usize,
    /// Local records deleted because the remote no longer has them
    pub pruned: usize,
    /// Existence checks that faulted
    pub check_failures: usize,
}

#[derive(Clone)]
pub struct UserService {
    inner: Arc<Inner>,
}

struct Inner {
    store: LocalStore,
    cache: Arc<OperationCache>,
    queue: Arc<BatchSyncQueue>,
    broker: ConnectionBroker,
    config: SyncConfig,
    primary: RwLock<Option<Arc<dyn AdminService>>>,
    reconciling: AtomicBool,
    tasks: TaskTracker,
}

impl UserService {
    pub fn new(
        store: LocalStore,
        cache: Arc<OperationCache>,
        queue: Arc<BatchSyncQueue>,
        broker: ConnectionBroker,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                cache,
                queue,
                broker,
                config,
                primary: RwLock::new(None),
                reconciling: AtomicBool::new(false),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Build the cache and queue from `config` and wire everything together.
    pub fn from_config(store: LocalStore, broker: ConnectionBroker, config: SyncConfig) -> Self {
        let cache = Arc::new(OperationCache::from_config(&config));
        let queue = Arc::new(BatchSyncQueue::from_config(cache.clone(), &config));
        Self::new(store, cache, queue, broker, config)
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    pub fn cache(&self) -> &Arc<OperationCache> {
        &self.inner.cache
    }

    pub fn queue(&self) -> &Arc<BatchSyncQueue> {
        &self.inner.queue
    }

    pub fn pending_operations(&self) -> usize {
        self.inner.queue.pending_count()
    }

    // ------------------------------------------------------------------
    // Primary handle
    // ------------------------------------------------------------------

    /// Install the long-lived remote handle.
    ///
    /// Returns `true` when this was an unset-to-set transition, in which case
    /// reconciliation and a batch sync were started in the background.
    pub fn set_primary(&self, remote: Arc<dyn AdminService>) -> bool {
        let was_unset = {
            let mut primary = self.inner.primary.write();
            let was_unset = primary.is_none();
            *primary = Some(remote.clone());
            was_unset
        };
        if !was_unset {
            tracing::debug!("Primary remote handle replaced");
            return false;
        }

        tracing::info!("Remote service connected, starting bidirectional sync");
        self.inner.reconciling.store(true, Ordering::Release);
        let service = self.clone();
        self.inner.tasks.spawn(async move {
            let report = service.reconcile(remote.as_ref()).await;
            service.inner.reconciling.store(false, Ordering::Release);
            tracing::info!("Bidirectional sync completed: {report:?}");
            service.execute_batch_sync();
        });
        true
    }

    pub fn clear_primary(&self) {
        if self.inner.primary.write().take().is_some() {
            tracing::info!("Remote service disconnected, switching to offline mode");
        }
    }

    pub fn has_primary(&self) -> bool {
        self.inner.primary.read().is_some()
    }

    pub fn state(&self) -> ConnectionState {
        if !self.has_primary() {
            ConnectionState::Offline
        } else if self.inner.reconciling.load(Ordering::Acquire) {
            ConnectionState::Reconciling
        } else {
            ConnectionState::Online
        }
    }

    fn primary(&self) -> Option<Arc<dyn AdminService>> {
        self.inner.primary.read().clone()
    }

    // ------------------------------------------------------------------
    // User operations
    // ------------------------------------------------------------------

    /// Username for valid credentials.
    ///
    /// Remote-first with a primary handle; a remote fault falls back to the
    /// local store for this call only.
    pub async fn login(&self, account: &str, password: &str) -> Option<String> {
        if !is_valid_account(account) {
            return None;
        }

        if let Some(remote) = self.primary() {
            match remote.login_admin(account, password).await {
                Ok(username) => return username,
                Err(error) => {
                    tracing::warn!("Server login failed, falling back to local data: {error}");
                }
            }
        }

        self.inner.store.login(account, password)
    }

    pub async fn register(&self, username: &str, account: &str, password: &str) -> bool {
        if !is_valid_username(username) || !is_valid_account(account) || !is_valid_password(password)
        {
            tracing::warn!("Rejected registration with invalid input");
            return false;
        }

        if let Some(remote) = self.primary() {
            match remote.register_user(username, account, password).await {
                Ok(true) => {
                    if !self.inner.store.register(username, account, password) {
                        tracing::error!("Local registration failed after server success for {username}");
                        return false;
                    }
                    self.inner.store.mark_synced(username);
                    self.spawn_notify(remote, SyncOperation::register(username, account, password));
                    return true;
                }
                Ok(false) => {
                    tracing::debug!("Server rejected registration of {username}, user may already exist");
                    return false;
                }
                Err(error) => {
                    tracing::warn!("Server error during registration, continuing offline: {error}");
                }
            }
        }

        self.apply_offline(SyncOperation::register(username, account, password), || {
            self.inner.store.register(username, account, password)
        })
    }

    pub async fn update_password(&self, username: &str, new_password: &str) -> bool {
        if !is_valid_password(new_password) {
            tracing::warn!("Rejected password update with invalid input");
            return false;
        }

        if let Some(remote) = self.primary() {
            match remote.update_user_password(username, new_password).await {
                Ok(()) => {
                    if !self.inner.store.update_password(username, new_password) {
                        tracing::error!("Local password update failed after server success for {username}");
                        return false;
                    }
                    self.inner.store.mark_synced(username);
                    self.spawn_notify(remote, SyncOperation::update_password(username, new_password));
                    return true;
                }
                Err(error) => {
                    tracing::warn!("Server error during password update, continuing offline: {error}");
                }
            }
        }

        self.apply_offline(SyncOperation::update_password(username, new_password), || {
            self.inner.store.update_password(username, new_password)
        })
    }

    pub async fn delete_user(&self, username: &str) -> bool {
        if let Some(remote) = self.primary() {
            match remote.delete_user(username).await {
                Ok(()) => {
                    // The remote is authoritative; a missing local row is the desired end state
                    if !self.inner.store.delete(username) {
                        tracing::debug!("No local record to delete for {username}");
                    }
                    self.spawn_notify(remote, SyncOperation::delete_user(username));
                    return true;
                }
                Err(error) => {
                    tracing::warn!("Server error during deletion, continuing offline: {error}");
                }
            }
        }

        self.apply_offline(SyncOperation::delete_user(username), || {
            self.inner.store.delete(username)
        })
    }

    /// Local write, then queue plus one direct push attempt.
    fn apply_offline(&self, operation: SyncOperation, apply_local: impl FnOnce() -> bool) -> bool {
        if !apply_local() {
            return false;
        }
        tracing::debug!("Applied locally, will try to notify server: {operation}");

        // A fresh local mutation supersedes any earlier outcome for the same key
        self.inner.cache.forget(&operation);
        self.inner.queue.enqueue(operation.clone());
        self.spawn_direct_push(operation);
        true
    }

    // ------------------------------------------------------------------
    // Background units
    // ------------------------------------------------------------------

    fn spawn_direct_push(&self, operation: SyncOperation) {
        let service = self.clone();
        self.inner.tasks.spawn(async move {
            service.push_directly(&operation).await;
        });
    }

    /// Send one operation over its own scoped connection.
    async fn push_directly(&self, operation: &SyncOperation) -> Option<SyncResult> {
        let queue = &self.inner.queue;
        let label = format!("direct {}", operation.kind());
        let outcome = self
            .inner
            .broker
            .with_connection(&self.inner.config.service, &label, |remote| async move {
                let result = queue.execute(remote.as_ref(), operation).await;
                if result.is_success() {
                    notify(remote.as_ref(), operation).await;
                }
                result
            })
            .await;

        match outcome {
            Ok(result) if result.is_success() => {
                tracing::debug!("Direct push succeeded: {operation}");
                self.inner.cache.record(operation, SyncResult::Success);
                self.confirm(operation);
                Some(result)
            }
            Ok(result) => {
                tracing::warn!("Direct push failed for {operation}: {result}");
                Some(result)
            }
            Err(_) => None,
        }
    }

    fn spawn_notify(&self, remote: Arc<dyn AdminService>, operation: SyncOperation) {
        self.inner.tasks.spawn(async move {
            notify(remote.as_ref(), &operation).await;
        });
    }

    /// Mark the local record synced if it still carries the pushed password.
    fn confirm(&self, operation: &SyncOperation) {
        match operation.kind() {
            OperationKind::Register | OperationKind::UpdatePassword => {
                let current = self.inner.store.get(operation.username());
                if current.is_some_and(|user| Some(user.password_plaintext.as_str()) == operation.password()) {
                    self.inner.store.mark_synced(operation.username());
                }
            }
            OperationKind::DeleteUser => {}
        }
    }

    // ------------------------------------------------------------------
    // Reconciliation and batch sync
    // ------------------------------------------------------------------

    /// Push unsynced local records, then prune records the remote lacks.
    pub async fn reconcile(&self, remote: &dyn AdminService) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let store = &self.inner.store;

        let unsynced = store.unsynced_records();
        tracing::debug!("Syncing {} unsynced users to server", unsynced.len());
        for user in unsynced {
            match remote
                .register_user(&user.username, &user.account, &user.password_plaintext)
                .await
            {
                Ok(created) => {
                    if created {
                        report.pushed += 1;
                    } else {
                        tracing::debug!("Server already has {}, marking synced", user.username);
                        report.already_present += 1;
                    }
                    store.mark_synced(&user.username);
                    let operation = SyncOperation::register(
                        &user.username,
                        &user.account,
                        &user.password_plaintext,
                    );
                    self.inner.cache.record(&operation, SyncResult::Success);
                }
                Err(error) => {
                    tracing::warn!("Error syncing user {} to server: {error}", user.username);
                    report.push_failures += 1;
                }
            }
        }

        let records = store.all_records_for_sync();
        tracing::debug!("Checking {} local users against server", records.len());
        for record in records {
            match remote.user_exists(&record.account).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!("User deleted on server, removing local account {}", record.account);
                    if store.delete_by_account(&record.account) {
                        report.pruned += 1;
                    }
                }
                Err(error) => {
                    tracing::warn!("Error checking account {} on server: {error}", record.account);
                    report.check_failures += 1;
                }
            }
        }

        report
    }

    /// Start one background batch dispatch.
    ///
    /// Returns `None` without side effects when a batch is already in flight.
    pub fn execute_batch_sync(&self) -> Option<JoinHandle<BatchReport>> {
        let Some(guard) = self.inner.queue.try_begin() else {
            tracing::debug!("Batch sync already in progress, skipping");
            return None;
        };

        let service = self.clone();
        Some(self.inner.tasks.spawn(async move {
            let _guard = guard;
            service.run_batch().await
        }))
    }

    async fn run_batch(&self) -> BatchReport {
        let operations = self.inner.queue.drain(self.inner.config.max_batch_size);
        if operations.is_empty() {
            tracing::debug!("No operations to sync");
            return BatchReport::default();
        }

        if let Some(remote) = self.primary() {
            return self.dispatch_and_confirm(remote.as_ref(), operations).await;
        }

        let batch = operations.clone();
        let outcome = self
            .inner
            .broker
            .with_connection(&self.inner.config.service, "batch sync", |remote| async move {
                self.dispatch_and_confirm(remote.as_ref(), batch).await
            })
            .await;

        outcome.unwrap_or_else(|error| {
            tracing::warn!("Batch sync skipped, server unreachable: {error}");
            self.inner.queue.requeue(operations);
            BatchReport::default()
        })
    }

    /// Dispatch one batch and confirm successes locally.
    async fn dispatch_and_confirm(
        &self,
        remote: &dyn AdminService,
        operations: Vec<SyncOperation>,
    ) -> BatchReport {
        let report = self.inner.queue.dispatch(remote, operations).await;
        for (operation, result) in &report.outcomes {
            if result.is_success() {
                self.confirm(operation);
            }
        }
        report
    }

    /// Open one scoped connection, reconcile over it and flush a batch.
    ///
    /// With a primary handle this only runs a batch sync.
    pub async fn try_connect_and_sync(&self) -> Result<(ReconcileReport, BatchReport), BindError> {
        if self.has_primary() {
            let batch = match self.execute_batch_sync() {
                Some(handle) => handle.await.unwrap_or_default(),
                None => BatchReport::default(),
            };
            return Ok((ReconcileReport::default(), batch));
        }

        tracing::debug!("Trying to connect to server for sync");
        self.inner
            .broker
            .with_connection(&self.inner.config.service, "connect and sync", |remote| async move {
                let reconciled = self.reconcile(remote.as_ref()).await;
                let batch = match self.inner.queue.try_begin() {
                    Some(_guard) => {
                        let operations = self.inner.queue.drain(self.inner.config.max_batch_size);
                        self.dispatch_and_confirm(remote.as_ref(), operations).await
                    }
                    None => BatchReport::default(),
                };
                (reconciled, batch)
            })
            .await
    }

    /// Wait until every spawned background unit has finished.
    pub async fn wait_idle(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }
}

/// Fire the one-way event hook matching a completed operation.
async fn notify(remote: &dyn AdminService, operation: &SyncOperation) {
    let username = operation.username();
    let result = match operation.kind() {
        OperationKind::Register => remote.notify_user_registered(username).await,
        OperationKind::UpdatePassword => {
            remote
                .notify_password_updated(username, operation.password().unwrap_or_default())
                .await
        }
        OperationKind::DeleteUser => remote.notify_user_deleted(username).await,
    };
    if let Err(error) = result {
        tracing::warn!("Error notifying server of {operation}: {error}");
    }
}
