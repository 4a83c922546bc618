use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    pub graphql_url: String,
    /// `memory`, `file:<path>` or a `redis://` URL.
    pub credential_store: String,
    /// When set, session token signatures are verified (HS256).
    pub session_jwt_secret: Option<String>,
    // Vercel (optional — domain routes answer 503 without a token)
    pub vercel_api_token: Option<String>,
    pub vercel_team_id: Option<String>,
    pub vercel_api_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
            graphql_url: required("GRAPHQL_URL")?,
            credential_store: env::var("CREDENTIAL_STORE")
                .unwrap_or_else(|_| "file:.console/authToken".into()),
            session_jwt_secret: optional("SESSION_JWT_SECRET"),
            vercel_api_token: optional("VERCEL_API_TOKEN"),
            vercel_team_id: optional("VERCEL_TEAM_ID"),
            vercel_api_base_url: env::var("VERCEL_API_BASE_URL")
                .unwrap_or_else(|_| crate::services::domains::DEFAULT_BASE_URL.into()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}
