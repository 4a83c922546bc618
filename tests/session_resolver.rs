mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;

use console_api::{
    models::{auth::ContactKey, client::ClientRecord, session::SessionPhase},
    services::{
        credentials::CredentialStore,
        directory::{IdentityDirectory, LookupError},
        session::SessionResolver,
        token::TokenDecoder,
    },
};

use common::token;

#[derive(Clone)]
enum Reply {
    Found(ClientRecord),
    Missing,
    Fail,
}

/// Directory with canned replies keyed by id / contact value. Records the
/// order in which lookups start and finish.
#[derive(Clone, Default)]
struct ScriptedDirectory {
    replies: HashMap<String, (Duration, Reply)>,
    log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDirectory {
    fn reply(mut self, key: &str, delay_ms: u64, reply: Reply) -> Self {
        self.replies
            .insert(key.to_string(), (Duration::from_millis(delay_ms), reply));
        self
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    async fn answer(&self, kind: &str, key: &str) -> Result<Option<ClientRecord>, LookupError> {
        self.log.lock().unwrap().push(format!("{kind}:{key} start"));
        let (delay, reply) = self
            .replies
            .get(key)
            .cloned()
            .unwrap_or((Duration::ZERO, Reply::Fail));
        sleep(delay).await;
        self.log.lock().unwrap().push(format!("{kind}:{key} end"));
        match reply {
            Reply::Found(client) => Ok(Some(client)),
            Reply::Missing => Ok(None),
            Reply::Fail => Err(LookupError::Graphql("backend unavailable".into())),
        }
    }
}

impl IdentityDirectory for ScriptedDirectory {
    async fn find_by_id(
        &self,
        _token: &str,
        client_id: &str,
    ) -> Result<Option<ClientRecord>, LookupError> {
        self.answer("id", client_id).await
    }

    async fn find_by_contact(
        &self,
        _token: &str,
        contact: &ContactKey,
    ) -> Result<Option<ClientRecord>, LookupError> {
        match contact {
            ContactKey::Email(email) => self.answer("email", email).await,
            ContactKey::Phone(phone) => self.answer("phone", phone).await,
        }
    }
}

fn client(id: &str, email: Option<&str>) -> ClientRecord {
    ClientRecord {
        id: id.into(),
        email: email.map(String::from),
        phone_number: None,
        first_name: None,
        last_name: None,
        company_name: None,
        tenant_id: None,
        role: None,
    }
}

fn resolver(directory: ScriptedDirectory) -> (SessionResolver<ScriptedDirectory>, CredentialStore) {
    let store = CredentialStore::memory();
    let resolver = SessionResolver::new(store.clone(), directory, TokenDecoder::new(None));
    (resolver, store)
}

#[tokio::test(start_paused = true)]
async fn resolves_client_by_id() {
    let directory =
        ScriptedDirectory::default().reply("c1", 20, Reply::Found(client("c1", Some("a@b.com"))));
    let (resolver, store) = resolver(directory);
    store.save(&token(json!({ "clientId": "c1" }))).await.unwrap();

    assert!(resolver.snapshot().loading);
    let state = tokio::time::timeout(Duration::from_millis(50), resolver.resolve())
        .await
        .expect("resolution took longer than 50ms");

    assert!(state.is_authenticated);
    assert!(!state.loading);
    assert_eq!(state.phase, SessionPhase::Resolved);
    assert_eq!(state.user.unwrap().id, "c1");
}

#[tokio::test(start_paused = true)]
async fn client_id_suppresses_contact_lookups() {
    let directory = ScriptedDirectory::default()
        .reply("c1", 30, Reply::Found(client("c1", None)))
        .reply("a@b.com", 0, Reply::Found(client("other", None)));
    let log = directory.clone();
    let (resolver, store) = resolver(directory);
    store
        .save(&token(json!({ "clientId": "c1", "email": "a@b.com", "phoneNumber": "+15550100" })))
        .await
        .unwrap();

    let state = resolver.resolve().await;

    assert_eq!(state.user.unwrap().id, "c1");
    assert_eq!(log.log(), vec!["id:c1 start", "id:c1 end"]);
}

#[tokio::test(start_paused = true)]
async fn failed_id_lookup_falls_back_to_email() {
    let directory = ScriptedDirectory::default()
        .reply("c1", 5, Reply::Fail)
        .reply("a@b.com", 5, Reply::Found(client("c9", Some("a@b.com"))));
    let log = directory.clone();
    let (resolver, store) = resolver(directory);
    store
        .save(&token(json!({ "clientId": "c1", "email": "a@b.com" })))
        .await
        .unwrap();

    let state = resolver.resolve().await;

    assert!(state.is_authenticated);
    assert_eq!(state.user.unwrap().id, "c9");
    assert_eq!(
        log.log(),
        vec!["id:c1 start", "id:c1 end", "email:a@b.com start", "email:a@b.com end"]
    );
}

#[tokio::test(start_paused = true)]
async fn missing_id_falls_back_to_phone() {
    let directory = ScriptedDirectory::default()
        .reply("c1", 0, Reply::Missing)
        .reply("+15550100", 0, Reply::Found(client("c2", None)));
    let (resolver, store) = resolver(directory);
    store
        .save(&token(json!({ "clientId": "c1", "phoneNumber": "+15550100" })))
        .await
        .unwrap();

    assert_eq!(resolver.resolve().await.user.unwrap().id, "c2");
}

#[tokio::test(start_paused = true)]
async fn failed_fallback_still_finishes_loading() {
    let directory = ScriptedDirectory::default()
        .reply("c1", 0, Reply::Fail)
        .reply("a@b.com", 0, Reply::Fail);
    let (resolver, store) = resolver(directory);
    let t = token(json!({ "clientId": "c1", "email": "a@b.com" }));
    store.save(&t).await.unwrap();

    let state = resolver.resolve().await;

    assert!(!state.loading);
    assert!(!state.is_authenticated);
    assert_eq!(state.phase, SessionPhase::Failed);
    assert!(state.error.is_some());
    // A lookup failure is not a credential failure.
    assert_eq!(store.load().await.unwrap(), Some(t));
}

#[tokio::test]
async fn no_stored_token_is_anonymous() {
    let (resolver, _store) = resolver(ScriptedDirectory::default());

    let state = resolver.resolve().await;

    assert!(!state.loading);
    assert!(!state.is_authenticated);
    assert_eq!(state.phase, SessionPhase::Anonymous);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let directory = ScriptedDirectory::default().reply("c1", 0, Reply::Found(client("c1", None)));
    let (resolver, store) = resolver(directory);
    store.save(&token(json!({ "clientId": "c1" }))).await.unwrap();
    assert!(resolver.resolve().await.is_authenticated);

    let once = resolver.logout().await;
    let twice = resolver.logout().await;

    assert_eq!(once, twice);
    assert!(!twice.is_authenticated);
    assert!(twice.user.is_none());
    assert!(!twice.loading);
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn undecodable_token_equals_logout() {
    let (garbage, garbage_store) = resolver(ScriptedDirectory::default());
    garbage_store.save("definitely.not.ajwt").await.unwrap();
    let after_decode_failure = garbage.resolve().await;

    let directory = ScriptedDirectory::default().reply("c1", 0, Reply::Found(client("c1", None)));
    let (explicit, explicit_store) = resolver(directory);
    explicit_store.save(&token(json!({ "clientId": "c1" }))).await.unwrap();
    explicit.resolve().await;
    let after_logout = explicit.logout().await;

    assert_eq!(after_decode_failure, after_logout);
    assert_eq!(garbage_store.load().await.unwrap(), None);
    assert_eq!(explicit_store.load().await.unwrap(), None);
}

#[tokio::test]
async fn expired_token_tears_down() {
    let (resolver, store) = resolver(ScriptedDirectory::default());
    store
        .save(&token(json!({ "clientId": "c1", "exp": 1_000 })))
        .await
        .unwrap();

    let state = resolver.resolve().await;

    assert_eq!(state.phase, SessionPhase::Anonymous);
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn refresh_without_token_keeps_session() {
    let directory = ScriptedDirectory::default().reply("c1", 0, Reply::Found(client("c1", None)));
    let (resolver, store) = resolver(directory);
    store.save(&token(json!({ "clientId": "c1" }))).await.unwrap();
    resolver.resolve().await;

    store.clear().await.unwrap();
    let state = resolver.refresh_auth().await;

    assert!(state.is_authenticated);
    assert!(!state.loading);
    assert_eq!(state.user.unwrap().id, "c1");
}

#[tokio::test(start_paused = true)]
async fn refresh_without_token_settles_interrupted_lookup() {
    let directory = ScriptedDirectory::default()
        .reply("c1", 0, Reply::Found(client("c1", None)))
        .reply("c2", 100, Reply::Found(client("c2", None)));
    let (resolver, store) = resolver(directory);
    store.save(&token(json!({ "clientId": "c1" }))).await.unwrap();
    resolver.resolve().await;

    store.save(&token(json!({ "clientId": "c2" }))).await.unwrap();
    let interrupt = async {
        sleep(Duration::from_millis(10)).await;
        store.clear().await.unwrap();
        resolver.refresh_auth().await
    };
    tokio::join!(resolver.refresh_auth(), interrupt);

    let state = resolver.snapshot();
    assert!(state.is_authenticated);
    assert!(!state.loading);
    assert_eq!(state.phase, SessionPhase::Resolved);
    assert_eq!(state.user.unwrap().id, "c1");
}

#[tokio::test(start_paused = true)]
async fn refresh_keeps_user_until_new_data_arrives() {
    let directory = ScriptedDirectory::default()
        .reply("c1", 0, Reply::Found(client("c1", None)))
        .reply("c2", 100, Reply::Found(client("c2", None)));
    let (resolver, store) = resolver(directory);
    store.save(&token(json!({ "clientId": "c1" }))).await.unwrap();
    resolver.resolve().await;

    store.save(&token(json!({ "clientId": "c2" }))).await.unwrap();
    let observe = async {
        sleep(Duration::from_millis(10)).await;
        resolver.snapshot()
    };
    let (final_state, mid) = tokio::join!(resolver.refresh_auth(), observe);

    assert_eq!(mid.phase, SessionPhase::Resolving);
    assert!(mid.loading);
    assert_eq!(mid.user.unwrap().id, "c1");
    assert_eq!(final_state.user.unwrap().id, "c2");
}

#[tokio::test(start_paused = true)]
async fn stale_lookup_does_not_overwrite_newer_one() {
    let directory = ScriptedDirectory::default()
        .reply("slow", 200, Reply::Found(client("slow", None)))
        .reply("fast", 10, Reply::Found(client("fast", None)));
    let (resolver, store) = resolver(directory);
    store.save(&token(json!({ "clientId": "slow" }))).await.unwrap();

    let second = async {
        sleep(Duration::from_millis(20)).await;
        store.save(&token(json!({ "clientId": "fast" }))).await.unwrap();
        resolver.refresh_auth().await
    };
    tokio::join!(resolver.refresh_auth(), second);

    let state = resolver.snapshot();
    assert_eq!(state.user.unwrap().id, "fast");
    assert_eq!(state.phase, SessionPhase::Resolved);
}

#[tokio::test(start_paused = true)]
async fn logout_during_lookup_wins() {
    let directory =
        ScriptedDirectory::default().reply("c1", 100, Reply::Found(client("c1", None)));
    let (resolver, store) = resolver(directory);
    store.save(&token(json!({ "clientId": "c1" }))).await.unwrap();

    let logout = async {
        sleep(Duration::from_millis(10)).await;
        resolver.logout().await
    };
    tokio::join!(resolver.resolve(), logout);

    let state = resolver.snapshot();
    assert!(!state.is_authenticated);
    assert!(state.user.is_none());
    assert_eq!(state.phase, SessionPhase::Anonymous);
}

#[tokio::test]
async fn subscribers_observe_transitions() {
    let directory = ScriptedDirectory::default().reply("c1", 0, Reply::Found(client("c1", None)));
    let (resolver, _store) = resolver(directory);
    let mut updates = resolver.subscribe();

    let state = resolver
        .sign_in(&token(json!({ "clientId": "c1" })))
        .await
        .unwrap();

    assert!(updates.has_changed().unwrap());
    assert_eq!(*updates.borrow_and_update(), state);
    resolver.logout().await;
    assert!(updates.has_changed().unwrap());
    assert!(!updates.borrow().is_authenticated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stale_decode_failure_keeps_newer_sign_in() {
    static RUN: AtomicU64 = AtomicU64::new(0);
    let dir = std::env::temp_dir().join(format!(
        "console-session-{}-{}",
        std::process::id(),
        RUN.fetch_add(1, Ordering::SeqCst)
    ));
    let store = CredentialStore::from_url(&format!("file:{}", dir.join("token").display()))
        .await
        .unwrap();
    let directory = ScriptedDirectory::default().reply("c1", 0, Reply::Found(client("c1", None)));
    let resolver = Arc::new(SessionResolver::new(
        store.clone(),
        directory,
        TokenDecoder::new(None),
    ));
    let good = token(json!({ "clientId": "c1" }));

    for _ in 0..100 {
        store.save("garbage").await.unwrap();

        let refreshing = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.refresh_auth().await }
        });
        let signing_in = tokio::spawn({
            let resolver = resolver.clone();
            let good = good.clone();
            async move { resolver.sign_in(&good).await.unwrap() }
        });
        refreshing.await.unwrap();
        signing_in.await.unwrap();

        let state = resolver.snapshot();
        assert!(state.is_authenticated);
        assert_eq!(store.load().await.unwrap().as_deref(), Some(good.as_str()));
    }

    let _ = tokio::fs::remove_dir_all(&dir).await;
}
