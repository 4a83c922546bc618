pub mod auth;
pub mod domains;
pub mod health;
pub mod metrics;
pub mod websocket;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post, put},
    Extension, Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{
    middleware::auth::{AppSession, SessionHandle},
    AppState,
};

/// Builds the API router with the session resolver installed as an extension.
pub fn router(state: AppState, session: Arc<AppSession>) -> Router {
    let cors = cors_layer(state.config.app_base_url.clone());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Session
        .route("/auth/session", get(auth::session))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/ws", get(websocket::session_ws))
        // Domains
        .route("/domains", get(domains::list_domains))
        .route("/domains/purchase", post(domains::purchase_domain))
        .route("/domains/{name}", get(domains::get_domain))
        .route("/domains/{name}/availability", get(domains::check_availability))
        .route("/domains/{name}/records", get(domains::list_records).post(domains::create_record))
        .route(
            "/domains/{name}/records/{record_id}",
            patch(domains::update_record).delete(domains::delete_record),
        )
        .route("/domains/{name}/transfer", post(domains::transfer_domain))
        .route("/domains/{name}/nameservers", put(domains::update_nameservers))
        .route("/domains/{name}/verify", post(domains::verify_domain))
        .route("/projects/{project_id}/domains", post(domains::add_domain))
        .layer(Extension(SessionHandle(session)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Allows the console origin and its tenant subdomains; localhost on any
/// port is allowed for development.
fn cors_layer(base_url: String) -> CorsLayer {
    let origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        origin
            .to_str()
            .is_ok_and(|o| is_allowed_origin(o, &base_url))
    });

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(origin)
}

fn is_allowed_origin(origin: &str, base_url: &str) -> bool {
    for host in ["http://localhost", "http://127.0.0.1"] {
        if let Some(rest) = origin.strip_prefix(host) {
            if rest.is_empty() || rest.starts_with(':') {
                return true;
            }
        }
    }
    if origin == base_url {
        return true;
    }
    let domain = base_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base_url);
    let domain = domain.split(['/', ':']).next().unwrap_or(domain);
    !domain.is_empty() && origin.ends_with(&format!(".{domain}"))
}
