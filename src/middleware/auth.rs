use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::models::client::ClientRecord;
use crate::services::{directory::GraphqlDirectory, session::SessionError, session::SessionResolver};

pub type AppSession = SessionResolver<GraphqlDirectory>;

pub type AuthRejection = (StatusCode, Json<Value>);

/// Extension type carrying the session resolver through request extensions.
#[derive(Clone)]
pub struct SessionHandle(pub Arc<AppSession>);

/// The installed session resolver.
///
/// Rejects with 500 when the router was built without a [`SessionHandle`]
/// layer; that is a wiring bug, not a client error.
pub struct CurrentSession(pub Arc<AppSession>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .map(|handle| CurrentSession(handle.0.clone()))
            .ok_or_else(|| {
                tracing::error!("{}", SessionError::NotInstalled);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": SessionError::NotInstalled.to_string() })),
                )
            })
    }
}

fn unauthorized(message: &str) -> AuthRejection {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message })))
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Accepts the caller only when `presented` is the stored session token.
pub async fn verify_caller(
    session: &AppSession,
    presented: Option<&str>,
) -> Result<(), AuthRejection> {
    let presented = presented.ok_or_else(|| unauthorized("Missing Authorization header"))?;
    let stored = session.store().load().await.map_err(|e| {
        tracing::error!("Could not read stored session token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Could not read session" })),
        )
    })?;

    match stored {
        Some(stored) if stored == presented => Ok(()),
        _ => Err(unauthorized("Invalid or expired session token")),
    }
}

/// The installed session resolver, reached by a caller that presents the
/// stored session token as a bearer token.
pub struct SessionCaller(pub Arc<AppSession>);

impl<S> FromRequestParts<S> for SessionCaller
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        verify_caller(&session, bearer_token(&parts.headers)).await?;
        Ok(SessionCaller(session))
    }
}

/// The resolved client of the current session.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient(pub ClientRecord);

impl<S> FromRequestParts<S> for AuthenticatedClient
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let SessionCaller(session) = SessionCaller::from_request_parts(parts, state).await?;
        let snapshot = session.snapshot();

        match snapshot.user {
            Some(user) if snapshot.is_authenticated => Ok(AuthenticatedClient(user)),
            _ if snapshot.loading => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Session is still resolving", "phase": snapshot.phase })),
            )),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Not authenticated", "phase": snapshot.phase })),
            )),
        }
    }
}
