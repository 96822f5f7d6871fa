//! Binds the admin service to its on-disk store.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use welcomate_core::{AdminService, AdminStore, BindError, ServiceBinder, ServiceIdentity};

pub struct LocalServiceBinder {
    service_db: PathBuf,
    offline: bool,
}

impl LocalServiceBinder {
    pub const fn new(service_db: PathBuf, offline: bool) -> Self {
        Self {
            service_db,
            offline,
        }
    }
}

#[async_trait]
impl ServiceBinder for LocalServiceBinder {
    async fn bind(&self, identity: &ServiceIdentity) -> Result<Arc<dyn AdminService>, BindError> {
        if self.offline {
            return Err(BindError::Refused(format!("{identity} (offline mode)")));
        }

        let store = AdminStore::open(&self.service_db).map_err(|error| {
            BindError::Unavailable(format!("{}: {error}", self.service_db.display()))
        })?;
        tracing::debug!("Bound {identity} at {}", self.service_db.display());
        Ok(Arc::new(store))
    }

    fn unbind(&self, identity: &ServiceIdentity) {
        tracing::debug!("Released {identity}");
    }
}
