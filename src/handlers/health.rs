use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::middleware::RequestContext;
use crate::services::PreferenceService;

/// GET /health - public store connectivity probe
pub async fn health(State(service): State<PreferenceService>, ctx: RequestContext) -> Response {
    let now = chrono::Utc::now();

    match service.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(parent: ctx.span(), error = %err, "health check degraded");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
                .into_response()
        }
    }
}
