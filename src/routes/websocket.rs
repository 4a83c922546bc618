use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    middleware::auth::{bearer_token, verify_caller, AuthRejection, CurrentSession},
    models::session::SessionState,
};

#[derive(Debug, Deserialize)]
pub struct WsQueryParams {
    pub token: Option<String>,
}

/// GET /auth/ws — pushes the session state on connect and after every change.
///
/// Browsers cannot set headers on a websocket handshake, so the session token
/// may also come as `?token=`.
pub async fn session_ws(
    CurrentSession(session): CurrentSession,
    Query(params): Query<WsQueryParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, AuthRejection> {
    let presented = params
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&headers));
    verify_caller(&session, presented).await?;

    let updates = session.subscribe();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, updates)))
}

async fn handle_socket(socket: WebSocket, mut updates: watch::Receiver<SessionState>) {
    let (mut sender, mut receiver) = socket.split();
    info!("Session WebSocket connected");

    let mut push_task = tokio::spawn(async move {
        loop {
            let payload = {
                let state = updates.borrow_and_update();
                serde_json::json!({ "type": "session", "payload": *state }).to_string()
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
    });

    let mut client_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(text) => debug!("Ignoring session WS message: {}", text),
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut push_task) => client_task.abort(),
        _ = (&mut client_task) => push_task.abort(),
    }

    info!("Session WebSocket disconnected");
}
