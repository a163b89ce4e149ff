// Request pipeline, outermost first:
// request_logger -> recover_panics -> jwt_auth_middleware -> handler
pub mod auth;
pub mod context;
pub mod logging;
pub mod recovery;

pub use auth::{extract_bearer, jwt_auth_middleware, SharedAuthenticator};
pub use context::RequestContext;
pub use logging::request_logger;
pub use recovery::{install_panic_hook, recover_panics};
