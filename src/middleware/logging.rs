use axum::{extract::Request, http::header::USER_AGENT, middleware::Next, response::Response};
use tracing::Instrument;

use super::context::RequestContext;

/// First pipeline stage: open the request span tagged with the client's user
/// agent, log the request line at debug, and hand the context downstream.
pub async fn request_logger(mut request: Request, next: Next) -> Response {
    let agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    let span = tracing::info_span!("request", agent = %agent);
    tracing::debug!(parent: &span, "{} {}", request.method(), request.uri());

    request
        .extensions_mut()
        .insert(RequestContext::new(span.clone()));

    next.run(request).instrument(span).await
}
