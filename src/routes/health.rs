use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{middleware::auth::CurrentSession, AppState};

pub async fn health_check(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> (StatusCode, Json<Value>) {
    match session.store().load().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "session": session.snapshot().phase,
                "credentialStore": session.store().kind(),
                "registrar": state.domains.is_some(),
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "credentialStore": e.to_string() })),
        ),
    }
}
