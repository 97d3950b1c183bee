//! End-to-end checks of the gateway and session over real HTTP.

use std::sync::{Arc, Mutex};

use minsoto::net::api;
use minsoto::net::types::Credentials;
use minsoto::state::session::SessionPhase;
use minsoto::{
    ApiError, AuthOutcome, ClientConfig, FileTokenStore, Gateway, MemoryTokenStore, Navigator, Route, SessionController,
    TokenStore,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Recorder {
    routes: Mutex<Vec<Route>>,
}

impl Navigator for Recorder {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

fn gateway(server: &MockServer, store: Arc<dyn TokenStore>, navigator: Arc<Recorder>) -> Arc<Gateway> {
    let config = ClientConfig::new("client-id").with_base_url(&server.uri());
    Arc::new(Gateway::from_config(&config, store, navigator).unwrap())
}

fn user() -> serde_json::Value {
    json!({ "id": 7, "username": "ana", "email": "ana@example.com", "username_is_default": false })
}

#[tokio::test]
async fn attaches_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connections/interests/"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "name": "Rust" }])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(Some("tok"), None));
    let gw = gateway(&server, store, Arc::new(Recorder::default()));
    let interests = api::interests(&gw).await.unwrap();
    assert_eq!(interests[0].name, "Rust");
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/user/"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .and(body_json(json!({ "refresh": "r1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "fresh", "refresh": "r2" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/user/"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(Some("stale"), Some("r1")));
    let gw = gateway(&server, store.clone(), Arc::new(Recorder::default()));
    let me = api::current_user(&gw).await.unwrap();

    assert_eq!(me.username, "ana");
    assert_eq!(store.access_token().as_deref(), Some("fresh"));
    assert_eq!(store.refresh_token().as_deref(), Some("r2"));
}

#[tokio::test]
async fn rejected_refresh_clears_tokens_and_sends_user_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/circles/habits/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "expired" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token is blacklisted" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(Some("stale"), Some("revoked")));
    let navigator = Arc::new(Recorder::default());
    let gw = gateway(&server, store.clone(), navigator.clone());
    let err = api::habits(&gw).await.unwrap_err();

    assert!(err.is_unauthorized(), "{err:?}");
    assert_eq!(store.access_token(), None);
    assert_eq!(store.refresh_token(), None);
    assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Login]);
}

#[tokio::test]
async fn bad_credentials_do_not_trigger_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "non_field_errors": ["Unable to log in with provided credentials."] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_tokens(None, Some("r1")));
    let gw = gateway(&server, store, Arc::new(Recorder::default()));
    let credentials = Credentials { email: "ana@example.com".into(), password: "wrong".into() };
    let err = api::login(&gw, &credentials).await.unwrap_err();

    assert!(matches!(err, ApiError::Validation { status: 400, .. }), "{err:?}");
    assert_eq!(err.user_message(), "Unable to log in with provided credentials.");
}

#[tokio::test]
async fn login_then_recover_from_persisted_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access": "a1", "refresh": "r1", "user": user() })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/user/"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = std::env::temp_dir().join(format!("minsoto-http-{}", std::process::id()));
    let file = dir.join("tokens.json");
    let _ = std::fs::remove_file(&file);

    let first = SessionController::new(gateway(
        &server,
        Arc::new(FileTokenStore::open(&file).unwrap()),
        Arc::new(Recorder::default()),
    ));
    let outcome = first.login("ana@example.com", "hunter22").await;
    assert_eq!(outcome, AuthOutcome::Success { redirect: Some(Route::Dashboard) });

    // A new process reads the same file and recovers without signing in.
    let second = SessionController::new(gateway(
        &server,
        Arc::new(FileTokenStore::open(&file).unwrap()),
        Arc::new(Recorder::default()),
    ));
    let session = second.recover().await;
    assert_eq!(session.phase(), SessionPhase::Authenticated);
    assert_eq!(session.user.map(|u| u.id), Some(7));

    let _ = std::fs::remove_dir_all(&dir);
}
