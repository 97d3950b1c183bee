//! Request gateway: bearer attachment plus 401 refresh-and-retry.
//!
//! ARCHITECTURE
//! ============
//! Every API call goes through [`Gateway::request`]. Outbound, the current
//! access token (if any) is read from the token store at send time and
//! attached as a bearer credential. Inbound, a [`RequestMachine`] decides
//! whether a 401 earns one refresh-and-retry or ends the session.
//!
//! TRADE-OFFS
//! ==========
//! With `coalesce_refresh` on, refresh attempts run one at a time behind an
//! async mutex, and a request whose access token was already replaced while
//! it waited simply retries with the new token. This keeps single-use
//! rotating refresh tokens from being spent twice by parallel 401s. With it
//! off, each failing request refreshes independently.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::json;

use super::phase::{FailCause, RequestMachine, Step};
use super::tokens::normalize_token_response;
use super::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::routes::{Navigator, Route};
use crate::storage::TokenStore;

pub const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Callback run after the gateway gives up on a session.
pub type ExpiryHook = Arc<dyn Fn() + Send + Sync>;

/// Registration handle for [`Gateway::remove_expiry_hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryHookId(u64);

pub struct Gateway {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    coalesce_refresh: bool,
    refresh_gate: tokio::sync::Mutex<()>,
    expiry_hooks: Mutex<Vec<(ExpiryHookId, ExpiryHook)>>,
    next_hook_id: AtomicU64,
}

impl Gateway {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            transport,
            store,
            navigator,
            coalesce_refresh: true,
            refresh_gate: tokio::sync::Mutex::new(()),
            expiry_hooks: Mutex::new(Vec::new()),
            next_hook_id: AtomicU64::new(0),
        }
    }

    /// Build a gateway over the reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client cannot be built.
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), store, navigator).with_coalesced_refresh(config.coalesce_refresh))
    }

    #[must_use]
    pub fn with_coalesced_refresh(mut self, enabled: bool) -> Self {
        self.coalesce_refresh = enabled;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    #[must_use]
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Register a callback for when refresh fails and tokens are cleared.
    pub fn on_session_expired(&self, hook: ExpiryHook) -> ExpiryHookId {
        let id = ExpiryHookId(self.next_hook_id.fetch_add(1, Ordering::Relaxed));
        self.hooks().push((id, hook));
        id
    }

    pub fn remove_expiry_hook(&self, id: ExpiryHookId) {
        self.hooks().retain(|(hook_id, _)| *hook_id != id);
    }

    #[cfg(test)]
    pub(crate) fn expiry_hook_count(&self) -> usize {
        self.hooks().len()
    }

    fn hooks(&self) -> std::sync::MutexGuard<'_, Vec<(ExpiryHookId, ExpiryHook)>> {
        self.expiry_hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // REQUESTS
    // =========================================================================

    /// Send a request, returning the response only for 2xx statuses.
    ///
    /// # Errors
    ///
    /// Non-2xx responses are classified with [`ApiError::from_response`].
    /// When the session cannot be recovered the error is the original 401
    /// (no refresh token) or the refresh call's error.
    pub async fn request(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut machine = RequestMachine::new(request.refresh_on_401);
        request.bearer = self.store.access_token();
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            authenticated = request.bearer.is_some(),
            "api request"
        );

        let response = self.transport.send(&request).await?;
        if machine.on_response(response.status) != Step::CheckRefresh {
            return into_result(response);
        }

        let original = ApiError::from_response(response.status, &response.body);
        self.recover(&mut machine, request.bearer.as_deref(), original)
            .await?;

        request.bearer = self.store.access_token();
        tracing::debug!(path = %request.path, "retrying with refreshed access token");
        let retried = self.transport.send(&request).await?;
        machine.on_response(retried.status);
        into_result(retried)
    }

    /// Send a request and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`Gateway::request`], plus [`ApiError::Decode`].
    pub async fn json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.request(request).await?.json()
    }

    /// Send a request and discard the body.
    ///
    /// # Errors
    ///
    /// Same as [`Gateway::request`].
    pub async fn execute(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.request(request).await.map(|_| ())
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    /// Drive the machine from `UnauthorizedFirst` to `Retried` or `Failed`.
    /// `Ok` means the caller should retry with the stored access token.
    async fn recover(
        &self,
        machine: &mut RequestMachine,
        sent_with: Option<&str>,
        original: ApiError,
    ) -> Result<(), ApiError> {
        let _gate = if self.coalesce_refresh { Some(self.refresh_gate.lock().await) } else { None };

        if self.coalesce_refresh {
            if let Some(current) = self.store.access_token() {
                if Some(current.as_str()) != sent_with {
                    tracing::debug!("access token already rotated; skipping refresh");
                    machine.on_token_rotated();
                    return Ok(());
                }
            }
        }

        let refresh_token = self.store.refresh_token();
        let step = machine.on_refresh_token(refresh_token.is_some());
        let refresh_token = match (step, refresh_token) {
            (Step::Refresh, Some(token)) => token,
            _ => {
                tracing::info!("access token rejected and no refresh token stored");
                self.expire_session();
                return Err(original);
            }
        };

        let outcome = self.refresh_access_token(&refresh_token).await;
        match machine.on_refresh_result(outcome.is_ok()) {
            Step::Retry => Ok(()),
            Step::Fail(FailCause::Original) => {
                self.expire_session();
                Err(original)
            }
            _ => {
                self.expire_session();
                Err(outcome.err().unwrap_or(original))
            }
        }
    }

    /// Exchange the refresh token for a new access token and persist it.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post(REFRESH_PATH)
            .json(json!({ "refresh": refresh_token }))
            .without_refresh();
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            let err = ApiError::from_response(response.status, &response.body);
            tracing::warn!(status = response.status, "token refresh rejected");
            return Err(err);
        }
        let pair = normalize_token_response(&response.json()?)?;
        self.store
            .store_pair(&pair)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        tracing::debug!(rotated = pair.refresh_token.is_some(), "access token refreshed");
        Ok(())
    }

    /// Clear both tokens, send the user to login, notify observers.
    fn expire_session(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "failed to clear tokens after session expiry");
        }
        self.navigator.navigate(Route::Login);
        let hooks: Vec<ExpiryHook> = self.hooks().iter().map(|(_, hook)| Arc::clone(hook)).collect();
        for hook in hooks {
            hook();
        }
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse, ApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response.status, &response.body))
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
