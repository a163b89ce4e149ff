use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::database::models::{Device, NewDevice, User};
use crate::database::store::{new_device_id, PreferenceStore, StoreError};

/// In-process store used for local runs (`memory://`) and tests.
///
/// Every mutation holds the write lock for its whole lookup-and-change, which
/// gives the same atomicity the SQL statements give in [`super::PgStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<i64, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_user(&self, id: i64) -> Result<User, StoreError> {
        let users = self.users.read().await;
        users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().cloned().collect())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        users
            .entry(user.id)
            .and_modify(|existing| existing.language.clone_from(&user.language))
            .or_insert_with(|| User::new(user.id, user.language.clone()));
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        users.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn add_device(&self, user_id: i64, device: NewDevice) -> Result<Device, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        let device = device.into_device(new_device_id());
        user.devices.push(device.clone());
        Ok(device)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
