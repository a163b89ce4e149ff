use serde::{Deserialize, Serialize};

use super::device::Device;

/// Notification preferences of one user, keyed by the external user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub language: String,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl User {
    /// A user with no devices yet, as created by the first upsert.
    pub fn new(id: i64, language: impl Into<String>) -> Self {
        Self {
            id,
            language: language.into(),
            devices: Vec::new(),
        }
    }
}
