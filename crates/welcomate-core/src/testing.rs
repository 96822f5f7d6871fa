//! In-memory fakes shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::broker::{BindError, ServiceBinder};
use crate::config::ServiceIdentity;
use crate::models::SyncRecord;
use crate::remote::{AdminService, RemoteError, RemoteResult};

#[derive(Clone)]
struct FakeUser {
    username: String,
    password: String,
}

/// Remote store keyed by account with switchable fault injection.
#[derive(Default)]
pub struct FakeAdminService {
    users: Mutex<HashMap<String, FakeUser>>,
    failure: Mutex<Option<RemoteError>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl FakeAdminService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, username: &str, account: &str, password: &str) {
        self.users.lock().insert(
            account.to_string(),
            FakeUser {
                username: username.to_string(),
                password: password.to_string(),
            },
        );
    }

    pub fn has_user(&self, account: &str) -> bool {
        self.users.lock().contains_key(account)
    }

    pub fn password_of(&self, account: &str) -> Option<String> {
        self.users.lock().get(account).map(|user| user.password.clone())
    }

    pub fn remove_account(&self, account: &str) {
        self.users.lock().remove(account);
    }

    pub fn fail_with(&self, failure: Option<RemoteError>) {
        *self.failure.lock() = failure;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == name).count()
    }

    async fn gate(&self, call: &str) -> RemoteResult<()> {
        self.calls.lock().push(call.to_string());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failure.lock().clone();
        failure.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl AdminService for FakeAdminService {
    async fn login_admin(&self, account: &str, password: &str) -> RemoteResult<Option<String>> {
        self.gate("login_admin").await?;
        Ok(self
            .users
            .lock()
            .get(account)
            .filter(|user| user.password == password)
            .map(|user| user.username.clone()))
    }

    async fn register_user(
        &self,
        username: &str,
        account: &str,
        password: &str,
    ) -> RemoteResult<bool> {
        self.gate("register_user").await?;
        let mut users = self.users.lock();
        if users.contains_key(account) || users.values().any(|user| user.username == username) {
            return Ok(false);
        }
        users.insert(
            account.to_string(),
            FakeUser {
                username: username.to_string(),
                password: password.to_string(),
            },
        );
        Ok(true)
    }

    async fn update_user_password(&self, username: &str, new_password: &str) -> RemoteResult<()> {
        self.gate("update_user_password").await?;
        if let Some(user) = self
            .users
            .lock()
            .values_mut()
            .find(|user| user.username == username)
        {
            user.password = new_password.to_string();
        }
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> RemoteResult<()> {
        self.gate("delete_user").await?;
        self.users.lock().retain(|_, user| user.username != username);
        Ok(())
    }

    async fn user_exists(&self, account: &str) -> RemoteResult<bool> {
        self.gate("user_exists").await?;
        Ok(self.has_user(account))
    }

    async fn get_local_users(&self) -> RemoteResult<Vec<SyncRecord>> {
        self.gate("get_local_users").await?;
        Ok(self
            .users
            .lock()
            .iter()
            .map(|(account, user)| SyncRecord {
                username: user.username.clone(),
                account: account.clone(),
                password: user.password.clone(),
            })
            .collect())
    }

    async fn clear_local_users(&self) -> RemoteResult<()> {
        self.gate("clear_local_users").await?;
        self.users.lock().clear();
        Ok(())
    }

    async fn notify_user_registered(&self, _username: &str) -> RemoteResult<()> {
        self.gate("notify_user_registered").await
    }

    async fn notify_user_deleted(&self, _username: &str) -> RemoteResult<()> {
        self.gate("notify_user_deleted").await
    }

    async fn notify_password_updated(
        &self,
        _username: &str,
        _new_password: &str,
    ) -> RemoteResult<()> {
        self.gate("notify_password_updated").await
    }
}

/// Binder that hands out one shared fake, or refuses when unreachable.
pub struct FakeBinder {
    service: Arc<FakeAdminService>,
    reachable: Mutex<bool>,
    binds: AtomicUsize,
    unbinds: AtomicUsize,
}

impl FakeBinder {
    pub fn new(service: Arc<FakeAdminService>) -> Self {
        Self {
            service,
            reachable: Mutex::new(true),
            binds: AtomicUsize::new(0),
            unbinds: AtomicUsize::new(0),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        *self.reachable.lock() = reachable;
    }

    pub fn binds(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn unbinds(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceBinder for FakeBinder {
    async fn bind(&self, identity: &ServiceIdentity) -> Result<Arc<dyn AdminService>, BindError> {
        if !*self.reachable.lock() {
            return Err(BindError::Refused(identity.to_string()));
        }
        self.binds.fetch_add(1, Ordering::SeqCst);
        Ok(self.service.clone())
    }

    fn unbind(&self, _identity: &ServiceIdentity) {
        self.unbinds.fetch_add(1, Ordering::SeqCst);
    }
}
