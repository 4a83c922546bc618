use axum::{http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    middleware::auth::{CurrentSession, SessionCaller},
    models::session::SessionState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

/// GET /auth/session — requires the stored token as a bearer token.
pub async fn session(SessionCaller(session): SessionCaller) -> Json<SessionState> {
    Json(session.snapshot())
}

/// POST /auth/login — stores the token issued by the backend and resolves it.
pub async fn login(
    CurrentSession(session): CurrentSession,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionState>, (StatusCode, Json<Value>)> {
    if body.token.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Token is required" })),
        ));
    }

    let state = session.sign_in(&body.token).await.map_err(|e| {
        tracing::error!("Could not store session token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Could not store session token" })),
        )
    })?;

    if state.is_authenticated {
        Ok(Json(state))
    } else {
        let message = state
            .error
            .clone()
            .unwrap_or_else(|| "Invalid or expired token".to_string());
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": message, "session": state })),
        ))
    }
}

/// POST /auth/refresh
pub async fn refresh(SessionCaller(session): SessionCaller) -> Json<SessionState> {
    Json(session.refresh_auth().await)
}

/// POST /auth/logout
pub async fn logout(SessionCaller(session): SessionCaller) -> Json<SessionState> {
    Json(session.logout().await)
}
