//! Scoped connections to the remote admin service.
//!
//! Each sync opportunity gets its own short-lived connection: bind, run one
//! callback, release. Release is tied to a lease guard, so it happens exactly
//! once whether the callback returns, panics, or the enclosing future is
//! dropped.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use crate::config::ServiceIdentity;
use crate::remote::AdminService;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    /// The bind request could not even be initiated
    #[error("Bind refused for {0}")]
    Refused(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Platform facility that turns a service identity into a live handle.
#[async_trait]
pub trait ServiceBinder: Send + Sync {
    async fn bind(&self, identity: &ServiceIdentity) -> Result<Arc<dyn AdminService>, BindError>;

    fn unbind(&self, identity: &ServiceIdentity);
}

#[derive(Clone)]
pub struct ConnectionBroker {
    binder: Arc<dyn ServiceBinder>,
    active: Arc<AtomicUsize>,
}

impl ConnectionBroker {
    pub fn new(binder: Arc<dyn ServiceBinder>) -> Self {
        Self {
            binder,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind, hand the handle to `on_connected` once, then release.
    ///
    /// `label` only identifies the connection in logs.
    pub async fn with_connection<F, Fut, T>(
        &self,
        identity: &ServiceIdentity,
        label: &str,
        on_connected: F,
    ) -> Result<T, BindError>
    where
        F: FnOnce(Arc<dyn AdminService>) -> Fut,
        Fut: Future<Output = T>,
    {
        let service = match self.binder.bind(identity).await {
            Ok(service) => service,
            Err(error) => {
                tracing::warn!("Failed to bind {identity} for {label}: {error}");
                return Err(error);
            }
        };

        let _lease = Lease::acquire(self, identity, label);
        tracing::debug!("Connected to {identity} for {label}");
        Ok(on_connected(service).await)
    }

    /// Number of scoped connections currently held.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

struct Lease {
    binder: Arc<dyn ServiceBinder>,
    active: Arc<AtomicUsize>,
    identity: ServiceIdentity,
    label: String,
}

impl Lease {
    fn acquire(broker: &ConnectionBroker, identity: &ServiceIdentity, label: &str) -> Self {
        broker.active.fetch_add(1, Ordering::AcqRel);
        Self {
            binder: Arc::clone(&broker.binder),
            active: Arc::clone(&broker.active),
            identity: identity.clone(),
            label: label.to_string(),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.binder.unbind(&self.identity);
        self.active.fetch_sub(1, Ordering::AcqRel);
        tracing::debug!("Service unbound for {}", self.label);
    }
}
