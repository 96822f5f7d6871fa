//! Client-side endpoint the admin service calls back into.

use async_trait::async_trait;

use crate::models::SyncRecord;
use crate::remote::{AdminService, RemoteError, RemoteResult};
use crate::store::LocalStore;

/// Exposes the local store through the admin contract.
///
/// Changes pushed from the service side are already authoritative, so a
/// password update received here is marked synced immediately.
#[derive(Clone)]
pub struct ClientSyncHandler {
    store: LocalStore,
}

impl ClientSyncHandler {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AdminService for ClientSyncHandler {
    async fn login_admin(&self, account: &str, password: &str) -> RemoteResult<Option<String>> {
        Ok(self.store.login(account, password))
    }

    async fn register_user(
        &self,
        username: &str,
        account: &str,
        password: &str,
    ) -> RemoteResult<bool> {
        Ok(self.store.register(username, account, password))
    }

    async fn update_user_password(&self, username: &str, new_password: &str) -> RemoteResult<()> {
        tracing::debug!("Receiving password update from service for {username}");
        if self.store.update_password(username, new_password) {
            self.store.mark_synced(username);
        } else {
            tracing::error!("Failed to apply password update for {username}");
        }
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> RemoteResult<()> {
        self.store.delete(username);
        Ok(())
    }

    async fn user_exists(&self, account: &str) -> RemoteResult<bool> {
        Ok(self.store.exists(account))
    }

    async fn get_local_users(&self) -> RemoteResult<Vec<SyncRecord>> {
        let records = self.store.all_records_for_sync();
        tracing::debug!("Returning {} users to service", records.len());
        Ok(records)
    }

    async fn clear_local_users(&self) -> RemoteResult<()> {
        if self.store.clear_all() {
            Ok(())
        } else {
            Err(RemoteError::Internal("failed to clear local users".to_string()))
        }
    }

    async fn notify_user_registered(&self, _username: &str) -> RemoteResult<()> {
        Ok(())
    }

    async fn notify_user_deleted(&self, _username: &str) -> RemoteResult<()> {
        Ok(())
    }

    async fn notify_password_updated(
        &self,
        _username: &str,
        _new_password: &str,
    ) -> RemoteResult<()> {
        Ok(())
    }
}
