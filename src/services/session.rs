use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::models::{
    auth::{ContactKey, IdentityKeys, LookupStrategy},
    client::ClientRecord,
    session::{SessionPhase, SessionState},
};
use crate::services::{
    credentials::{CredentialStore, StoreError},
    directory::IdentityDirectory,
    metrics,
    token::TokenDecoder,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("session resolver must be installed before handling session requests")]
    NotInstalled,
}

/// Resolves the signed-in client from the stored session token.
///
/// Every resolution and every logout takes a new generation number; a
/// lookup that finishes after a newer generation started is dropped, so a
/// slow refresh can never overwrite a later one or revive a logged-out
/// session. Writes to the stored credential happen under `writes` together
/// with the generation check, so a stale resolution never clears a token that
/// a newer sign-in stored.
pub struct SessionResolver<D> {
    store: CredentialStore,
    directory: D,
    decoder: TokenDecoder,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
    writes: Mutex<()>,
}

impl<D: IdentityDirectory> SessionResolver<D> {
    pub fn new(store: CredentialStore, directory: D, decoder: TokenDecoder) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            store,
            directory,
            decoder,
            state,
            generation: AtomicU64::new(0),
            writes: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Initial resolution, run once at startup.
    pub async fn resolve(&self) -> SessionState {
        self.refresh_auth().await
    }

    /// Re-reads the stored token and re-runs decode + lookup.
    ///
    /// With no stored token only `loading` is cleared; an authenticated
    /// session is left as it is.
    pub async fn refresh_auth(&self) -> SessionState {
        let generation = self.begin();
        self.resolve_stored(generation).await
    }

    /// Stores a new token, replacing any previous one, and resolves it.
    pub async fn sign_in(&self, token: &str) -> Result<SessionState, SessionError> {
        let generation = {
            let _writes = self.writes.lock().await;
            self.store.save(token.trim()).await?;
            self.begin()
        };
        Ok(self.resolve_stored(generation).await)
    }

    /// Clears the stored token and all session fields. Safe to call repeatedly.
    pub async fn logout(&self) -> SessionState {
        {
            let _writes = self.writes.lock().await;
            let generation = self.begin();
            self.clear_store().await;
            self.commit(generation, |s| *s = SessionState::signed_out());
        }
        info!("Session logged out");
        self.snapshot()
    }

    async fn resolve_stored(&self, generation: u64) -> SessionState {
        let token = match self.store.load().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read stored session token: {}", e);
                None
            }
        };

        match token {
            Some(token) => self.resolve_token(generation, &token).await,
            None => {
                debug!("No stored session token");
                self.commit(generation, |s| {
                    s.loading = false;
                    s.phase = if s.is_authenticated {
                        SessionPhase::Resolved
                    } else {
                        SessionPhase::Anonymous
                    };
                });
                metrics::record_resolution("no_token");
                self.snapshot()
            }
        }
    }

    async fn resolve_token(&self, generation: u64, token: &str) -> SessionState {
        let claims = match self.decoder.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Discarding stored session token: {}", e);
                metrics::record_resolution("decode_failed");
                self.discard(generation).await;
                return self.snapshot();
            }
        };

        self.commit(generation, |s| {
            s.loading = true;
            s.phase = SessionPhase::Resolving;
        });

        let outcome = self.lookup(token, IdentityKeys::from(&claims)).await;

        let applied = self.commit(generation, |s| match outcome {
            Ok(user) => {
                s.is_authenticated = true;
                s.user = Some(user);
                s.loading = false;
                s.phase = SessionPhase::Resolved;
                s.resolved_at = Some(Utc::now());
                s.error = None;
            }
            Err(message) => {
                s.is_authenticated = false;
                s.user = None;
                s.loading = false;
                s.phase = SessionPhase::Failed;
                s.error = Some(message);
            }
        });

        if applied {
            let state = self.snapshot();
            metrics::record_resolution(&state.phase.to_string());
            if let Some(user) = &state.user {
                info!(
                    "Session resolved: client={} ({}) tenant={}",
                    user.id,
                    user.display_name(),
                    claims.tenant_id.as_deref().unwrap_or("-")
                );
            }
        } else {
            debug!("Dropping stale session lookup (generation {})", generation);
            metrics::record_resolution("stale");
        }
        self.snapshot()
    }

    /// Runs the lookup chosen by precedence. A failed id lookup clears the id
    /// key and falls through to whichever contact key the token carried.
    async fn lookup(&self, token: &str, mut keys: IdentityKeys) -> Result<ClientRecord, String> {
        let mut last_error = None;

        while let Some(strategy) = keys.strategy() {
            match strategy {
                LookupStrategy::ById(id) => {
                    match self.directory.find_by_id(token, &id).await {
                        Ok(Some(client)) => {
                            metrics::record_lookup("id", "found");
                            return Ok(client);
                        }
                        Ok(None) => {
                            metrics::record_lookup("id", "not_found");
                            last_error = Some(format!("No client with id {id}"));
                        }
                        Err(e) => {
                            metrics::record_lookup("id", "error");
                            warn!("Client lookup by id failed, falling back: {}", e);
                            last_error = Some(e.to_string());
                        }
                    }
                    keys = keys.without_client_id();
                }
                LookupStrategy::ByContact(contact) => {
                    let label = match &contact {
                        ContactKey::Email(_) => "email",
                        ContactKey::Phone(_) => "phone",
                    };
                    return match self.directory.find_by_contact(token, &contact).await {
                        Ok(Some(client)) => {
                            metrics::record_lookup(label, "found");
                            Ok(client)
                        }
                        Ok(None) => {
                            metrics::record_lookup(label, "not_found");
                            Err(format!("No client matches the session {label}"))
                        }
                        Err(e) => {
                            metrics::record_lookup(label, "error");
                            warn!("Client lookup by {} failed: {}", label, e);
                            Err(e.to_string())
                        }
                    };
                }
            }
        }

        Err(last_error.unwrap_or_else(|| "Session token carries no client identity".to_string()))
    }

    /// Signs out after an undecodable token, unless a newer resolution or
    /// logout has started since `generation`.
    async fn discard(&self, generation: u64) {
        let _writes = self.writes.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Keeping stored session token; generation {} is stale", generation);
            return;
        }
        self.clear_store().await;
        self.commit(generation, |s| *s = SessionState::signed_out());
    }

    async fn clear_store(&self) {
        if let Err(e) = self.store.clear().await {
            warn!("Could not clear stored session token: {}", e);
        }
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Applies `apply` only if no newer generation has started. The check runs
    /// under the channel's write lock.
    fn commit(&self, generation: u64, apply: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            apply(state);
            true
        })
    }
}
