// Public:    GET  /health
// Protected: POST /query  (bearer token required)
pub mod health;
pub mod language;
pub mod query;

pub use health::health;
pub use query::{query, Operation};
