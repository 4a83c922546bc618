use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use console_api::{
    config::Config,
    routes,
    services::{
        credentials::CredentialStore, directory::GraphqlDirectory, session::SessionResolver,
        token::TokenDecoder,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let store = CredentialStore::from_url(&config.credential_store).await?;
    info!("Credential store: {}", store.kind());

    let session = Arc::new(SessionResolver::new(
        store,
        GraphqlDirectory::new(config.graphql_url.clone()),
        TokenDecoder::new(config.session_jwt_secret.as_deref()),
    ));
    let initial = session.resolve().await;
    info!("Initial session state: {}", initial.phase);

    let state = AppState::new(config.clone());
    if state.domains.is_some() {
        info!("Vercel domain management configured");
    } else {
        info!("VERCEL_API_TOKEN not set — domain routes disabled");
    }

    let app = routes::router(state, session);

    let addr = format!("{}:{}", config.host, config.port);
    info!("console API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
