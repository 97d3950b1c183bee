use serde_json::json;

use super::*;
use crate::net::gateway::REFRESH_PATH;
use crate::net::transport::{ApiRequest, TransportError};
use crate::storage::TokenStore;
use crate::test_helpers::{Harness, MockTransport, harness, response, user_json};

fn controller(h: &Harness) -> SessionController {
    SessionController::new(h.gateway.clone())
}

fn login_server(username_is_default: bool) -> MockTransport {
    MockTransport::responding(move |req| match req.path.as_str() {
        "/auth/login/" => (
            200,
            json!({ "access_token": "A", "refresh_token": "B", "user": user_json("u", username_is_default) }),
        ),
        _ => (404, json!({})),
    })
}

fn registration(password2: &str) -> Registration {
    Registration {
        email: "new@x.com".into(),
        username: "newbie".into(),
        password: "s3cret-pw".into(),
        password2: password2.into(),
    }
}

// =============================================================
// Startup recovery
// =============================================================

#[tokio::test]
async fn starts_loading_and_guard_waits() {
    let h = harness(MockTransport::responding(|_| (200, json!({}))), None, None);
    let session = controller(&h);
    assert_eq!(session.session().phase(), SessionPhase::Loading);
    assert_eq!(session.guard(), GuardDecision::Wait);
}

#[tokio::test]
async fn no_tokens_recovers_anonymous_without_network() {
    let h = harness(MockTransport::responding(|_| (200, json!({}))), None, None);
    let session = controller(&h);
    let state = session.recover().await;

    assert_eq!(state, Session::anonymous());
    assert!(h.transport.calls().is_empty());
    assert_eq!(session.guard(), GuardDecision::Redirect(Route::Login));
}

#[tokio::test]
async fn refresh_token_alone_recovers_anonymous_and_keeps_it() {
    let h = harness(MockTransport::responding(|_| (200, json!({}))), None, Some("r1"));
    let session = controller(&h);
    assert!(!session.recover().await.is_authenticated());
    assert!(h.transport.calls().is_empty());
    assert_eq!(h.store.refresh_token().as_deref(), Some("r1"));
}

#[tokio::test]
async fn valid_access_token_recovers_user() {
    let h = harness(MockTransport::responding(|_| (200, user_json("ana", false))), Some("A"), Some("B"));
    let session = controller(&h);
    let state = session.recover().await;

    assert_eq!(state.phase(), SessionPhase::Authenticated);
    assert_eq!(state.user.unwrap().username, "ana");
    assert_eq!(session.guard(), GuardDecision::Allow);
}

#[tokio::test]
async fn expired_access_token_recovers_after_one_refresh_and_one_retry() {
    let transport = MockTransport::responding(|req| match req.path.as_str() {
        REFRESH_PATH => (200, json!({ "access": "fresh" })),
        "/auth/user/" if req.bearer.as_deref() == Some("fresh") => (200, user_json("ana", false)),
        _ => (401, json!({ "detail": "Token expired" })),
    });
    let h = harness(transport, Some("expired"), Some("valid-refresh"));
    let session = controller(&h);
    let state = session.recover().await;

    assert!(state.is_authenticated());
    assert!(!state.loading);
    assert_eq!(h.transport.calls_to(REFRESH_PATH), 1);
    assert_eq!(h.transport.calls_to("/auth/user/"), 2);
    assert_eq!(h.store.access_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn failed_refresh_during_recovery_ends_anonymous() {
    let transport = MockTransport::responding(|req| match req.path.as_str() {
        REFRESH_PATH => (401, json!({ "detail": "Token is blacklisted" })),
        _ => (401, json!({})),
    });
    let h = harness(transport, Some("expired"), Some("revoked"));
    let session = controller(&h);
    let state = session.recover().await;

    assert_eq!(state, Session::anonymous());
    assert_eq!(session.token_pair(), None);
    assert_eq!(h.store.refresh_token(), None);
    assert_eq!(h.navigator.last(), Some(Route::Login));
}

#[tokio::test]
async fn server_error_during_recovery_clears_tokens() {
    let h = harness(MockTransport::responding(|_| (500, json!("down"))), Some("A"), Some("B"));
    let session = controller(&h);
    let state = session.recover().await;
    assert_eq!(state, Session::anonymous());
    assert_eq!(h.store.access_token(), None);
    assert_eq!(h.store.refresh_token(), None);
}

// =============================================================
// Password login
// =============================================================

#[tokio::test]
async fn login_persists_tokens_and_redirects_to_dashboard() {
    let h = harness(login_server(false), None, None);
    let session = controller(&h);
    session.recover().await;

    let outcome = session.login("user@x.com", "pw").await;

    assert_eq!(outcome, AuthOutcome::Success { redirect: Some(Route::Dashboard) });
    assert_eq!(session.session().phase(), SessionPhase::Authenticated);
    assert_eq!(h.store.access_token().as_deref(), Some("A"));
    assert_eq!(h.store.refresh_token().as_deref(), Some("B"));
    assert_eq!(h.navigator.last(), Some(Route::Dashboard));
}

#[tokio::test]
async fn default_username_redirects_to_profile_completion() {
    let h = harness(login_server(true), None, None);
    let session = controller(&h);
    let outcome = session.login("user@x.com", "pw").await;
    assert_eq!(outcome, AuthOutcome::Success { redirect: Some(Route::CompleteProfile) });
    assert_eq!(h.navigator.last(), Some(Route::CompleteProfile));
}

#[tokio::test]
async fn login_replaces_stale_refresh_token() {
    let transport = MockTransport::responding(|_| (200, json!({ "key": "K", "user": user_json("u", false) })));
    let h = harness(transport, None, Some("someone-elses"));
    let session = controller(&h);
    assert!(session.login("u@x.com", "pw").await.is_success());
    assert_eq!(h.store.access_token().as_deref(), Some("K"));
    assert_eq!(h.store.refresh_token(), None);
}

#[tokio::test]
async fn login_without_user_fetches_current_user() {
    let transport = MockTransport::responding(|req| match req.path.as_str() {
        "/auth/login/" => (200, json!({ "access": "A", "refresh": "B" })),
        _ => (200, user_json("fetched", false)),
    });
    let h = harness(transport, None, None);
    let session = controller(&h);
    assert!(session.login("u@x.com", "pw").await.is_success());
    assert_eq!(session.session().user.unwrap().username, "fetched");
    assert_eq!(h.transport.calls()[1].bearer.as_deref(), Some("A"));
}

#[tokio::test]
async fn login_without_user_rolls_back_when_lookup_fails() {
    let transport = MockTransport::responding(|req| match req.path.as_str() {
        "/auth/login/" => (200, json!({ "access": "A", "refresh": "B" })),
        _ => (500, json!(null)),
    });
    let h = harness(transport, None, None);
    let session = controller(&h);

    assert!(!session.login("u@x.com", "pw").await.is_success());
    assert_eq!(h.store.access_token(), None);
    assert_eq!(h.store.refresh_token(), None);
    assert_eq!(session.session(), Session::anonymous());
    assert_eq!(session.guard(), GuardDecision::Redirect(Route::Login));
}

#[tokio::test]
async fn login_failure_surfaces_first_validation_message() {
    let transport = MockTransport::responding(|_| {
        (400, json!({ "non_field_errors": ["Unable to log in with provided credentials."] }))
    });
    let h = harness(transport, None, None);
    let session = controller(&h);
    session.recover().await;

    let outcome = session.login("user@x.com", "wrong").await;
    assert_eq!(
        outcome,
        AuthOutcome::Failure { error: "Unable to log in with provided credentials.".into() }
    );
    assert!(!session.session().is_authenticated());
    assert_eq!(h.store.access_token(), None);
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn login_network_failure_uses_fallback() {
    let h = harness(MockTransport::new(|_| Err(TransportError::Request("refused".into()))), None, None);
    let session = controller(&h);
    match session.login("user@x.com", "pw").await {
        AuthOutcome::Failure { error } => assert!(error.contains("Could not reach the server")),
        other => panic!("expected failure, got {other:?}"),
    }
}

// =============================================================
// Google
// =============================================================

#[tokio::test]
async fn callback_decodes_code_before_exchange() {
    let transport = MockTransport::responding(|_| {
        (200, json!({ "access_token": "A", "refresh_token": "B", "user": user_json("g", true) }))
    });
    let h = harness(transport, None, None);
    let session = controller(&h);
    let outcome = session.complete_google_callback("4%2F0AX4XfWh").await;

    assert!(outcome.is_success());
    assert_eq!(h.transport.calls()[0].body, Some(json!({ "code": "4/0AX4XfWh" })));
    assert_eq!(h.navigator.last(), Some(Route::CompleteProfile));
}

#[tokio::test]
async fn callback_failure_goes_to_login_error() {
    let h = harness(
        MockTransport::responding(|_| (400, json!({ "error": "invalid_grant" }))),
        None,
        None,
    );
    let session = controller(&h);
    let outcome = session.complete_google_callback("bad").await;
    assert_eq!(outcome, AuthOutcome::Failure { error: "invalid_grant".into() });
    assert_eq!(h.navigator.last(), Some(Route::LoginError));
}

#[tokio::test]
async fn callback_without_code_never_calls_server() {
    let h = harness(MockTransport::responding(|_| (200, json!({}))), None, None);
    let session = controller(&h);
    assert!(!session.complete_google_callback("").await.is_success());
    assert!(h.transport.calls().is_empty());
    assert_eq!(h.navigator.last(), Some(Route::LoginError));
}

#[tokio::test]
async fn id_token_login_authenticates() {
    let transport = MockTransport::responding(|_| (200, json!({ "token": "T", "user": user_json("g", false) })));
    let h = harness(transport, None, None);
    let session = controller(&h);
    let outcome = session.login_with_google(&GoogleCredential::IdToken("jwt".into())).await;
    assert_eq!(outcome, AuthOutcome::Success { redirect: Some(Route::Dashboard) });
    assert_eq!(h.store.access_token().as_deref(), Some("T"));
}

// =============================================================
// Registration
// =============================================================

#[tokio::test]
async fn mismatched_passwords_fail_locally() {
    let h = harness(MockTransport::responding(|_| (201, json!({}))), None, None);
    let session = controller(&h);
    let outcome = session.register(&registration("different")).await;
    assert!(!outcome.is_success());
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn registration_does_not_sign_in() {
    let h = harness(
        MockTransport::responding(|_| (201, json!({ "detail": "Verification e-mail sent." }))),
        None,
        None,
    );
    let session = controller(&h);
    session.recover().await;
    let outcome = session.register(&registration("s3cret-pw")).await;

    assert_eq!(outcome, AuthOutcome::Success { redirect: None });
    assert!(!session.session().is_authenticated());
    assert_eq!(h.store.access_token(), None);
}

#[tokio::test]
async fn registration_errors_are_joined() {
    let transport = MockTransport::responding(|_| {
        (400, json!({ "password": ["This password is too short.", "This password is too common."], "username": ["taken"] }))
    });
    let h = harness(transport, None, None);
    let session = controller(&h);
    let outcome = session.register(&registration("s3cret-pw")).await;
    assert_eq!(
        outcome,
        AuthOutcome::Failure {
            error: "password: This password is too short., This password is too common. username: taken".into()
        }
    );
}

// =============================================================
// Logout and expiry
// =============================================================

#[tokio::test]
async fn logout_clears_everything_even_when_server_unreachable() {
    let transport = MockTransport::new(|req| match req.path.as_str() {
        "/auth/logout/" => Err(TransportError::Request("connection reset".into())),
        _ => Ok(response(200, &user_json("ana", false))),
    });
    let h = harness(transport, Some("A"), Some("B"));
    let session = controller(&h);
    session.recover().await;
    assert!(session.session().is_authenticated());

    session.logout().await;

    assert_eq!(session.session(), Session::anonymous());
    assert_eq!(h.store.access_token(), None);
    assert_eq!(h.store.refresh_token(), None);
    assert_eq!(h.navigator.last(), Some(Route::Login));
}

#[tokio::test]
async fn failed_refresh_elsewhere_drops_session() {
    let transport = MockTransport::responding(|req| match (req.path.as_str(), req.bearer.as_deref()) {
        ("/auth/user/", Some("A")) => (200, user_json("ana", false)),
        (REFRESH_PATH, _) => (401, json!({ "detail": "expired" })),
        _ => (401, json!({})),
    });
    let h = harness(transport, Some("A"), Some("B"));
    let session = controller(&h);
    let mut updates = session.subscribe();
    session.recover().await;
    assert!(session.session().is_authenticated());

    h.gateway.request(ApiRequest::get("/circles/habits/")).await.unwrap_err();

    assert_eq!(session.session(), Session::anonymous());
    assert!(updates.has_changed().unwrap());
    assert!(!updates.borrow_and_update().is_authenticated());

    h.gateway.request(ApiRequest::get("/circles/habits/")).await.unwrap_err();
    assert_eq!(h.transport.calls().last().unwrap().bearer, None);
}

// =============================================================
// Profile completion
// =============================================================

#[tokio::test]
async fn complete_profile_updates_user_and_goes_to_dashboard() {
    let transport = MockTransport::responding(|req| match req.path.as_str() {
        "/auth/user/" => (200, user_json("user_4821", true)),
        _ => (200, json!({})),
    });
    let h = harness(transport, Some("A"), Some("B"));
    let session = controller(&h);
    session.recover().await;

    let patch = ProfilePatch { bio: Some("Climber".into()), theme_color: Some("#112233".into()), ..ProfilePatch::default() };
    let outcome = session.complete_profile("ana", &patch).await;

    assert_eq!(outcome, AuthOutcome::Success { redirect: Some(Route::Dashboard) });
    let user = session.session().user.unwrap();
    assert_eq!(user.username, "ana");
    assert!(!user.username_is_default);
    assert_eq!(user.profile.unwrap()["bio"], "Climber");
    assert_eq!(h.transport.paths(), vec!["/auth/user/", "/auth/username/", "/profiles/me/"]);
    assert_eq!(h.navigator.last(), Some(Route::Dashboard));
}

#[tokio::test]
async fn taken_username_reports_field_message() {
    let transport = MockTransport::responding(|_| (400, json!({ "username": ["This username is already taken."] })));
    let h = harness(transport, Some("A"), None);
    let session = controller(&h);
    let outcome = session.complete_profile("ana", &ProfilePatch::default()).await;
    assert_eq!(outcome, AuthOutcome::Failure { error: "This username is already taken.".into() });
    assert_eq!(h.transport.calls().len(), 1);
}

#[tokio::test]
async fn update_user_is_noop_when_anonymous() {
    let h = harness(MockTransport::responding(|_| (200, json!({}))), None, None);
    let session = controller(&h);
    session.recover().await;
    session.update_user(UserPatch { username: Some("x".into()), profile: None });
    assert_eq!(session.session(), Session::anonymous());
}

#[tokio::test]
async fn token_pair_reflects_store() {
    let h = harness(MockTransport::responding(|_| (200, json!({}))), Some("A"), Some("B"));
    let session = controller(&h);
    let pair = session.token_pair().unwrap();
    assert_eq!(pair.access_token, "A");
    assert_eq!(pair.refresh_token.as_deref(), Some("B"));
    h.store.clear().unwrap();
    assert_eq!(session.token_pair(), None);
}

#[test]
fn dropped_controller_unregisters_expiry_hook() {
    let h = harness(MockTransport::responding(|_| (200, json!({}))), None, None);
    let first = controller(&h);
    let second = controller(&h);
    assert_eq!(h.gateway.expiry_hook_count(), 2);

    drop(first);
    assert_eq!(h.gateway.expiry_hook_count(), 1);
    drop(second);
    assert_eq!(h.gateway.expiry_hook_count(), 0);
}
