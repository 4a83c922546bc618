// Library exports for the binaries and tests
pub mod config;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use services::domains::VercelClient;

/// Application state shared across all handlers.
///
/// The session resolver is not part of it; handlers reach it through the
/// [`middleware::auth::SessionHandle`] extension.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub domains: Option<VercelClient>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        let domains = config.vercel_api_token.as_ref().map(|token| {
            VercelClient::new(token.clone(), config.vercel_team_id.clone())
                .with_base_url(config.vercel_api_base_url.clone())
        });
        Self { config, domains }
    }
}
