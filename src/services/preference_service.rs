use std::sync::Arc;
use thiserror::Error;

use crate::database::models::{Device, NewDevice, User};
use crate::database::{PreferenceStore, StoreError};

/// Coarse classification used by callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Internal,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    #[error("failed to {op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    /// Recast a store error: the store's not-found sentinel becomes the
    /// service's own, anything else is wrapped with the operation name.
    fn from_store(op: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |err| match err {
            StoreError::NotFound => ServiceError::NotFound,
            source => ServiceError::Storage { op, source },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound => ErrorKind::NotFound,
            ServiceError::Storage { .. } => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Stateless front for the preference store. Callers see only
/// [`ServiceError`], never the store's error vocabulary.
#[derive(Clone)]
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub async fn get_user(&self, id: i64) -> Result<User, ServiceError> {
        self.store
            .get_user(id)
            .await
            .map_err(ServiceError::from_store("get user"))
    }

    pub async fn get_users(&self) -> Result<Vec<User>, ServiceError> {
        self.store
            .get_users()
            .await
            .map_err(ServiceError::from_store("get users"))
    }

    pub async fn upsert_user(&self, user: &User) -> Result<(), ServiceError> {
        self.store
            .upsert_user(user)
            .await
            .map_err(ServiceError::from_store("upsert user"))
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ServiceError> {
        self.store
            .delete_user(id)
            .await
            .map_err(ServiceError::from_store("delete user"))
    }

    pub async fn add_device(&self, user_id: i64, device: NewDevice) -> Result<Device, ServiceError> {
        self.store
            .add_device(user_id, device)
            .await
            .map_err(ServiceError::from_store("add device"))
    }

    /// Store connectivity, for the health endpoint.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        self.store
            .health_check()
            .await
            .map_err(ServiceError::from_store("check store health"))
    }
}
