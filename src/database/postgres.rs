use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::models::{Device, Frequency, NewDevice, NotificationSettings, User};
use crate::database::store::{new_device_id, PreferenceStore, StoreError};

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY,
        language TEXT NOT NULL,
        devices JSONB NOT NULL DEFAULT '[]'::jsonb
    )
"#;

/// PostgreSQL-backed store. Each user is one row; devices are embedded as a
/// JSONB array so that appends are single-row atomic updates.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    language: String,
    devices: Json<Vec<DeviceDocument>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            language: row.language,
            devices: row.devices.0.into_iter().map(Device::from).collect(),
        }
    }
}

/// Embedded device layout inside `users.devices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceDocument {
    id: String,
    name: String,
    #[serde(default)]
    price_changed: bool,
    #[serde(default)]
    frequency: Frequency,
}

impl From<DeviceDocument> for Device {
    fn from(doc: DeviceDocument) -> Self {
        Device {
            id: doc.id,
            name: doc.name,
            settings: NotificationSettings {
                price_changed: doc.price_changed,
                frequency: doc.frequency,
            },
        }
    }
}

impl From<Device> for DeviceDocument {
    fn from(device: Device) -> Self {
        DeviceDocument {
            id: device.id,
            name: device.name,
            price_changed: device.settings.price_changed,
            frequency: device.settings.frequency,
        }
    }
}

impl PgStore {
    /// Connect to `config.uri` with its path swapped for `config.name`, then
    /// make sure the users table exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let connection_string = build_connection_string(&config.uri, &config.name)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&connection_string)
            .await
            .map_err(StoreError::database("connect to database"))?;

        let store = Self::from_pool(pool);
        store.create_schema().await?;

        info!("Created database pool for: {}", config.name);
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn create_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(StoreError::database("create schema"))?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    async fn get_user(&self, id: i64) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, language, devices FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database("get user"))?;

        row.map(User::from).ok_or(StoreError::NotFound)
    }

    async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT id, language, devices FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::database("get users"))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        // Devices are owned by add_device; an upsert never touches them.
        sqlx::query(
            "INSERT INTO users (id, language) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET language = EXCLUDED.language",
        )
        .bind(user.id)
        .bind(&user.language)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database("upsert user"))?;

        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::database("delete user"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn add_device(&self, user_id: i64, device: NewDevice) -> Result<Device, StoreError> {
        let document = DeviceDocument::from(device.into_device(new_device_id()));

        // The row lock taken by UPDATE serialises concurrent appends, and
        // RETURNING sees the row version written by this statement, so the
        // last element is the device appended here.
        let appended = sqlx::query_scalar::<_, Json<DeviceDocument>>(
            "UPDATE users SET devices = devices || jsonb_build_array($2::jsonb)
             WHERE id = $1
             RETURNING devices -> -1",
        )
        .bind(user_id)
        .bind(Json(&document))
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database("add device"))?;

        appended
            .map(|Json(doc)| Device::from(doc))
            .ok_or(StoreError::NotFound)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::database("ping database"))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

/// Replace the path of `base` with `/{database_name}`, keeping credentials,
/// host and query parameters.
pub fn build_connection_string(base: &str, database_name: &str) -> Result<String, StoreError> {
    let mut url = url::Url::parse(base).map_err(|e| StoreError::Database {
        op: "parse database uri",
        source: sqlx::Error::Configuration(Box::new(e)),
    })?;
    url.set_path(&format!("/{}", database_name));
    Ok(url.into())
}
