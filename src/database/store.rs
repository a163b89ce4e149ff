use async_trait::async_trait;
use thiserror::Error;

use crate::database::models::{Device, NewDevice, User};

/// Errors from a preference store.
///
/// `NotFound` is the only condition callers are expected to branch on;
/// everything else carries the failed operation and its cause.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("failed to {op}: {source}")]
    Database {
        op: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    pub fn database(op: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| StoreError::Database { op, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Durable storage of users and their devices.
///
/// Implementations must make `upsert_user` and `add_device` atomic against
/// concurrent callers on the same user; neither may be built from separate
/// read and write calls. Dropping a returned future cancels the operation.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Point lookup by external user id.
    async fn get_user(&self, id: i64) -> Result<User, StoreError>;

    /// All stored users. Order carries no meaning.
    async fn get_users(&self) -> Result<Vec<User>, StoreError>;

    /// Create the user, or update only its language when it already exists.
    async fn upsert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Remove the user. A missing user is reported as `NotFound`.
    async fn delete_user(&self, id: i64) -> Result<(), StoreError>;

    /// Assign a fresh id, append the device to the user's list and return
    /// exactly the appended device, in one atomic step.
    async fn add_device(&self, user_id: i64, device: NewDevice) -> Result<Device, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    /// Release underlying connections. Called once during shutdown.
    async fn close(&self) {}
}

/// Fresh store-assigned device id.
pub fn new_device_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
