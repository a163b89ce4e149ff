pub mod preference_service;

pub use preference_service::{ErrorKind, PreferenceService, ServiceError};
