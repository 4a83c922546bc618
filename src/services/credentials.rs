use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Fixed key the session token is stored under.
pub const CREDENTIAL_KEY: &str = "authToken";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Credential redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Unsupported credential store: {0}")]
    Unsupported(String),
}

/// Single-slot persistent storage for the session token.
///
/// Writers always overwrite the whole value; nothing is merged.
#[derive(Clone)]
pub enum CredentialStore {
    Memory(Arc<Mutex<Option<String>>>),
    File(PathBuf),
    Redis {
        conn: redis::aio::MultiplexedConnection,
        key: String,
    },
}

impl CredentialStore {
    pub fn memory() -> Self {
        CredentialStore::Memory(Arc::new(Mutex::new(None)))
    }

    /// Builds a store from `memory`, `file:<dir-or-path>` or a `redis://` URL.
    pub async fn from_url(url: &str) -> Result<Self, StoreError> {
        if url == "memory" {
            return Ok(Self::memory());
        }
        if let Some(path) = url.strip_prefix("file:") {
            let mut path = PathBuf::from(path);
            if path.is_dir() {
                path.push(CREDENTIAL_KEY);
            }
            return Ok(CredentialStore::File(path));
        }
        if url.starts_with("redis://") || url.starts_with("rediss://") {
            let client = redis::Client::open(url)?;
            let conn = client.get_multiplexed_async_connection().await?;
            return Ok(CredentialStore::Redis {
                conn,
                key: format!("console:{CREDENTIAL_KEY}"),
            });
        }
        Err(StoreError::Unsupported(url.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CredentialStore::Memory(_) => "memory",
            CredentialStore::File(_) => "file",
            CredentialStore::Redis { .. } => "redis",
        }
    }

    /// Reads the stored token. Blank values count as absent.
    pub async fn load(&self) -> Result<Option<String>, StoreError> {
        let raw = match self {
            CredentialStore::Memory(slot) => slot.lock().map(|s| s.clone()).unwrap_or_default(),
            CredentialStore::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(s) => Some(s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            },
            CredentialStore::Redis { conn, key } => {
                let mut conn = conn.clone();
                redis::cmd("GET").arg(key).query_async(&mut conn).await?
            }
        };
        Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
    }

    pub async fn save(&self, token: &str) -> Result<(), StoreError> {
        match self {
            CredentialStore::Memory(slot) => {
                if let Ok(mut s) = slot.lock() {
                    *s = Some(token.to_string());
                }
            }
            CredentialStore::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, token).await?;
            }
            CredentialStore::Redis { conn, key } => {
                let mut conn = conn.clone();
                let _: () = redis::cmd("SET").arg(key).arg(token).query_async(&mut conn).await?;
            }
        }
        Ok(())
    }

    /// Removes the stored token. Clearing an empty slot is not an error.
    pub async fn clear(&self) -> Result<(), StoreError> {
        match self {
            CredentialStore::Memory(slot) => {
                if let Ok(mut s) = slot.lock() {
                    *s = None;
                }
            }
            CredentialStore::File(path) => match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
            CredentialStore::Redis { conn, key } => {
                let mut conn = conn.clone();
                let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            }
        }
        Ok(())
    }
}
