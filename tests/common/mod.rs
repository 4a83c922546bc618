#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{extract::Request, http::StatusCode, Json, Router};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::Value;

/// One request seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub auth: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Call {
        self.calls().pop().expect("no upstream call recorded")
    }
}

type Responder = Arc<dyn Fn(&Call) -> (StatusCode, Value) + Send + Sync>;

/// Starts an upstream stand-in on an ephemeral port. Every request is recorded
/// and answered by `respond`.
pub async fn mock_upstream(
    respond: impl Fn(&Call) -> (StatusCode, Value) + Send + Sync + 'static,
) -> (String, Recorder) {
    let recorder = Recorder::default();
    let respond: Responder = Arc::new(respond);

    let rec = recorder.clone();
    let app = Router::new().fallback(move |req: Request| {
        let rec = rec.clone();
        let respond = respond.clone();
        async move {
            let (parts, body) = req.into_parts();
            let bytes = axum::body::to_bytes(body, usize::MAX)
                .await
                .unwrap_or_default();
            let call = Call {
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
                query: parts.uri.query().map(String::from),
                auth: parts
                    .headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from),
                body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
            };
            let (status, reply) = respond(&call);
            rec.calls.lock().unwrap().push(call);
            (status, Json(reply))
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), recorder)
}

pub fn token(claims: Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}
