use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
};
use tracing::Span;

use crate::auth::Principal;
use crate::error::ApiError;

/// Request-scoped state handed from stage to stage and into handlers.
///
/// The span is the request's logger; the principal is present only after the
/// authentication stage accepted the request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    span: Span,
    principal: Option<Principal>,
}

impl RequestContext {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            principal: None,
        }
    }

    /// Context installed by the logging stage, or a bare one bound to the
    /// current span when the stage did not run.
    pub fn of(request: &Request) -> Self {
        request
            .extensions()
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::new(Span::current()))
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn principal(&self) -> Option<Principal> {
        self.principal
    }

    /// The authenticated principal. Its absence means a route was wired
    /// without the authentication stage, which is a server fault.
    pub fn authenticated(&self) -> Result<Principal, ApiError> {
        self.principal
            .ok_or_else(|| ApiError::internal_server_error("principal missing from request context"))
    }

    /// Same request, now authenticated and logging under `span`.
    pub fn with_principal(self, principal: Principal, span: Span) -> Self {
        Self {
            span,
            principal: Some(principal),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| ApiError::internal_server_error("request context missing"))
    }
}
