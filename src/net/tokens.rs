//! Token response normalization.
//!
//! The backend has shipped several response shapes over time. Rather than
//! destructuring ad hoc at each call site, every login, OAuth and refresh
//! response goes through [`normalize_token_response`].
//!
//! PRIORITY ORDER
//! ==============
//! - access token: `access_token`, `access`, `key`, `token`
//! - refresh token: `refresh_token`, `refresh`

use serde_json::Value;

use super::types::UserSummary;
use crate::error::ApiError;

const ACCESS_KEYS: &[&str] = &["access_token", "access", "key", "token"];
const REFRESH_KEYS: &[&str] = &["refresh_token", "refresh"];

/// Opaque bearer credentials. The client never decodes them.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Tokens plus the user summary that login endpoints embed next to them.
#[derive(Debug, Clone)]
pub struct LoginEnvelope {
    pub tokens: TokenPair,
    pub user: Option<UserSummary>,
}

/// Extract a [`TokenPair`] from any supported response shape.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] when no access token field is present.
pub fn normalize_token_response(raw: &Value) -> Result<TokenPair, ApiError> {
    let access_token = first_string(raw, ACCESS_KEYS)
        .ok_or_else(|| ApiError::Decode("token response has no access token".into()))?;
    let refresh_token = first_string(raw, REFRESH_KEYS);
    Ok(TokenPair { access_token, refresh_token })
}

/// Extract tokens and the optional `user` object from a login response.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] when no access token is present or the
/// `user` object does not match [`UserSummary`].
pub fn normalize_login_response(raw: &Value) -> Result<LoginEnvelope, ApiError> {
    let tokens = normalize_token_response(raw)?;
    let user = match raw.get("user") {
        None | Some(Value::Null) => None,
        Some(user) => Some(
            serde_json::from_value::<UserSummary>(user.clone())
                .map_err(|e| ApiError::Decode(format!("login user: {e}")))?,
        ),
    };
    Ok(LoginEnvelope { tokens, user })
}

fn first_string(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| raw.get(*k))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "tokens_test.rs"]
mod tests;
