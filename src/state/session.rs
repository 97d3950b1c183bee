//! Session controller: the authentication lifecycle.
//!
//! DESIGN
//! ======
//! One owned [`Session`] value published through a `watch` channel. Views
//! read it with [`SessionController::session`] or follow it with
//! [`SessionController::subscribe`]; only the controller writes it.
//!
//! ```text
//!   LOADING ──recover()──▶ AUTHENTICATED ──logout() / refresh failed──▶ ANONYMOUS
//!      │                        ▲                                          │
//!      └──no token / failure────┼──────────────────────────────────────────┘
//!                               └──────────── login() ◀────────────────────┘
//! ```
//!
//! The gateway reports unrecoverable 401s through an expiry hook, which
//! drops the session to ANONYMOUS even when the failing request came from
//! a feature hook rather than from the controller.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::watch;

pub use crate::net::api::GoogleCredential;
use crate::error::ApiError;
use crate::net::api;
use crate::net::gateway::{ExpiryHookId, Gateway};
use crate::net::tokens::{LoginEnvelope, TokenPair};
use crate::net::types::{Credentials, ProfilePatch, Registration, UserPatch, UserSummary};
use crate::routes::{GuardDecision, Route, post_login_route};

const PASSWORD_MISMATCH: &str = "Passwords do not match.";
const MISSING_CODE: &str = "Missing authorization code.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Loading,
    Authenticated,
}

/// `isAuthenticated` is derived from `user`, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user: Option<UserSummary>,
    pub loading: bool,
}

impl Session {
    #[must_use]
    pub const fn loading() -> Self {
        Self { user: None, loading: true }
    }

    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None, loading: false }
    }

    #[must_use]
    pub const fn authenticated(user: UserSummary) -> Self {
        Self { user: Some(user), loading: false }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Loading
        } else if self.user.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }
}

/// Result of a sign-in style operation. Failures carry display text and
/// never panic or propagate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Success { redirect: Option<Route> },
    Failure { error: String },
}

impl AuthOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    fn failure(error: impl Into<String>) -> Self {
        Self::Failure { error: error.into() }
    }
}

pub struct SessionController {
    gateway: Arc<Gateway>,
    state: Arc<watch::Sender<Session>>,
    expiry_hook: ExpiryHookId,
}

impl SessionController {
    /// Start in LOADING and follow gateway session expiry.
    #[must_use]
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let state = Arc::new(watch::Sender::new(Session::loading()));
        let weak = Arc::downgrade(&state);
        let expiry_hook = gateway.on_session_expired(Arc::new(move || {
            if let Some(state) = weak.upgrade() {
                tracing::info!("session expired; now anonymous");
                state.send_replace(Session::anonymous());
            }
        }));
        Self { gateway, state, expiry_hook }
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Currently stored tokens, if any.
    #[must_use]
    pub fn token_pair(&self) -> Option<TokenPair> {
        let store = self.gateway.store();
        store
            .access_token()
            .map(|access_token| TokenPair { access_token, refresh_token: store.refresh_token() })
    }

    /// Decision for a protected page.
    #[must_use]
    pub fn guard(&self) -> GuardDecision {
        let session = self.session();
        match session.phase() {
            SessionPhase::Loading => GuardDecision::Wait,
            SessionPhase::Authenticated => GuardDecision::Allow,
            SessionPhase::Anonymous => GuardDecision::Redirect(Route::Login),
        }
    }

    fn publish(&self, session: Session) {
        tracing::debug!(phase = ?session.phase(), "session changed");
        self.state.send_replace(session);
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    /// Validate any persisted access token. Always ends with `loading=false`.
    ///
    /// An expired access token is refreshed and the user fetch retried by
    /// the gateway; any remaining failure clears the tokens.
    pub async fn recover(&self) -> Session {
        let store = self.gateway.store();
        if store.access_token().is_none() {
            tracing::info!(has_refresh_token = store.refresh_token().is_some(), "no access token; anonymous");
            self.publish(Session::anonymous());
            return self.session();
        }

        match api::current_user(&self.gateway).await {
            Ok(user) => {
                tracing::info!(username = %user.username, "session recovered");
                self.publish(Session::authenticated(user));
            }
            Err(e) => {
                tracing::warn!(error = %e, "session recovery failed");
                if let Err(e) = store.clear() {
                    tracing::error!(error = %e, "failed to clear tokens");
                }
                self.publish(Session::anonymous());
            }
        }
        self.session()
    }

    // =========================================================================
    // SIGN-IN
    // =========================================================================

    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        let credentials = Credentials { email: email.to_owned(), password: password.to_owned() };
        match api::login(&self.gateway, &credentials).await {
            Ok(envelope) => self.establish(envelope).await,
            Err(e) => {
                tracing::info!(error = %e, "password login failed");
                AuthOutcome::failure(e.user_message())
            }
        }
    }

    pub async fn login_with_google(&self, credential: &GoogleCredential) -> AuthOutcome {
        match api::google_login(&self.gateway, credential).await {
            Ok(envelope) => self.establish(envelope).await,
            Err(e) => {
                tracing::info!(error = %e, "google login failed");
                AuthOutcome::failure(e.user_message())
            }
        }
    }

    /// Finish the OAuth redirect flow with the raw `code` query value.
    /// Any failure sends the user to the login-error page.
    pub async fn complete_google_callback(&self, raw_code: &str) -> AuthOutcome {
        let code = match urlencoding::decode(raw_code) {
            Ok(code) if !code.trim().is_empty() => code.into_owned(),
            _ => {
                self.gateway.navigator().navigate(Route::LoginError);
                return AuthOutcome::failure(MISSING_CODE);
            }
        };
        let outcome = self.login_with_google(&GoogleCredential::AuthCode(code)).await;
        if !outcome.is_success() {
            self.gateway.navigator().navigate(Route::LoginError);
        }
        outcome
    }

    /// Persist tokens, resolve the user, publish AUTHENTICATED, redirect.
    async fn establish(&self, envelope: LoginEnvelope) -> AuthOutcome {
        let store = self.gateway.store();
        let persisted = store.clear().and_then(|()| store.store_pair(&envelope.tokens));
        if let Err(e) = persisted {
            tracing::error!(error = %e, "failed to persist tokens");
            return AuthOutcome::failure(ApiError::Storage(e.to_string()).user_message());
        }

        let user = match envelope.user {
            Some(user) => user,
            None => match api::current_user(&self.gateway).await {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!(error = %e, "login returned no user and lookup failed");
                    if let Err(clear_err) = store.clear() {
                        tracing::error!(error = %clear_err, "failed to clear tokens after failed login");
                    }
                    self.publish(Session::anonymous());
                    return AuthOutcome::failure(e.user_message());
                }
            },
        };

        let redirect = post_login_route(&user);
        tracing::info!(username = %user.username, path = %redirect.path(), "signed in");
        self.publish(Session::authenticated(user));
        self.gateway.navigator().navigate(redirect.clone());
        AuthOutcome::Success { redirect: Some(redirect) }
    }

    /// Create an account. Does not sign in: the server gates on email
    /// verification.
    pub async fn register(&self, registration: &Registration) -> AuthOutcome {
        if registration.password != registration.password2 {
            return AuthOutcome::failure(PASSWORD_MISMATCH);
        }
        match api::register(&self.gateway, registration).await {
            Ok(()) => AuthOutcome::Success { redirect: None },
            Err(e) => {
                tracing::info!(error = %e, "registration failed");
                let message = match e.field_errors() {
                    Some(errors) if !errors.is_empty() => errors.joined(),
                    _ => e.user_message(),
                };
                AuthOutcome::failure(message)
            }
        }
    }

    // =========================================================================
    // SIGN-OUT & UPDATES
    // =========================================================================

    /// Best-effort server logout, then always clear tokens and go anonymous.
    pub async fn logout(&self) {
        if let Err(e) = api::logout(&self.gateway).await {
            tracing::warn!(error = %e, "server logout failed; clearing local session anyway");
        }
        if let Err(e) = self.gateway.store().clear() {
            tracing::error!(error = %e, "failed to clear tokens");
        }
        self.publish(Session::anonymous());
        self.gateway.navigator().navigate(Route::Login);
    }

    /// Merge a partial update into the signed-in user. No-op when anonymous.
    pub fn update_user(&self, patch: UserPatch) {
        self.state.send_if_modified(|session| match session.user.as_mut() {
            Some(user) => {
                user.apply(patch);
                true
            }
            None => false,
        });
    }

    /// Claim a username, save profile fields, then go to the dashboard.
    pub async fn complete_profile(&self, username: &str, profile: &ProfilePatch) -> AuthOutcome {
        if let Err(e) = api::claim_username(&self.gateway, username).await {
            tracing::info!(error = %e, "username claim failed");
            return AuthOutcome::failure(e.user_message());
        }
        if !profile.is_empty() {
            if let Err(e) = api::update_my_profile(&self.gateway, profile).await {
                tracing::info!(error = %e, "profile update failed");
                return AuthOutcome::failure(e.user_message());
            }
        }

        let profile = if profile.is_empty() { None } else { serde_json::to_value(profile).ok() };
        self.update_user(UserPatch { username: Some(username.to_owned()), profile });
        self.gateway.navigator().navigate(Route::Dashboard);
        AuthOutcome::Success { redirect: Some(Route::Dashboard) }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.gateway.remove_expiry_hook(self.expiry_hook);
    }
}
