use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::Instrument;

use super::context::RequestContext;
use crate::auth::Authenticator;
use crate::error::ApiError;

const BEARER_PREFIX: &str = "Bearer ";

/// Shared verifier handed to [`jwt_auth_middleware`] as router state.
pub type SharedAuthenticator = Arc<dyn Authenticator>;

/// Third pipeline stage: authenticate the bearer token and attach the
/// principal. Unauthorized requests stop here.
pub async fn jwt_auth_middleware(
    State(authenticator): State<SharedAuthenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::of(&request);

    let Some(token) = extract_bearer(request.headers()) else {
        return ApiError::unauthorized("missing token").respond(ctx.span());
    };

    let principal = match authenticator.authenticate(token) {
        Ok(principal) => principal,
        Err(err) if err.is_invalid_token() => {
            return ApiError::unauthorized("invalid access token")
                .caused_by(&err)
                .respond(ctx.span());
        }
        Err(err) => {
            return ApiError::internal_server_error("failed to validate access token")
                .caused_by(&err)
                .respond(ctx.span());
        }
    };

    let span = tracing::info_span!(parent: ctx.span(), "principal", user_id = principal.user_id);
    request
        .extensions_mut()
        .insert(ctx.with_principal(principal, span.clone()));

    next.run(request).instrument(span).await
}

/// Token from `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively; an empty token counts as no token.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }

    let token = &value[BEARER_PREFIX.len()..];
    (!token.is_empty()).then_some(token)
}
