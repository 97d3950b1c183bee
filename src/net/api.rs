//! Typed calls for every REST endpoint the client consumes.
//!
//! Each function is a thin wrapper around [`Gateway`]: build the request,
//! send it through the refresh-aware gateway, decode the body. Auth entry
//! points (login, Google, registration, logout) opt out of refresh-and-retry
//! since a 401 there means bad credentials, not an expired session.

use serde_json::{Value, json};

use super::gateway::Gateway;
use super::tokens::{LoginEnvelope, normalize_login_response};
use super::transport::ApiRequest;
use super::types::{
    Ack, Circle, CompletionResult, Connection, ConnectionRequest, Credentials, FeedQuery, Habit,
    HabitCompletion, HabitPatch, Interest, LikeState, NewCircle, NewHabit, NewInterest, NewPost,
    Post, Profile, ProfilePatch, Registration, RequestAction, SendConnectionRequest, UserSummary,
};
use crate::error::ApiError;

/// What the Google sign-in widget handed back.
#[derive(Clone, PartialEq, Eq)]
pub enum GoogleCredential {
    /// Identity token from the one-tap / button flow.
    IdToken(String),
    /// Authorization code from the redirect flow.
    AuthCode(String),
}

impl GoogleCredential {
    fn body(&self) -> Value {
        match self {
            Self::IdToken(token) => json!({ "access_token": token }),
            Self::AuthCode(code) => json!({ "code": code }),
        }
    }
}

impl std::fmt::Debug for GoogleCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdToken(_) => f.write_str("IdToken(<redacted>)"),
            Self::AuthCode(_) => f.write_str("AuthCode(<redacted>)"),
        }
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

// =============================================================================
// AUTH
// =============================================================================

/// `POST /auth/login/`
///
/// # Errors
///
/// Validation errors carry the server's field payload.
pub async fn login(gateway: &Gateway, credentials: &Credentials) -> Result<LoginEnvelope, ApiError> {
    let request = ApiRequest::post("/auth/login/")
        .json(to_body(credentials)?)
        .without_refresh();
    let raw: Value = gateway.json(request).await?;
    normalize_login_response(&raw)
}

/// `POST /auth/google/`
///
/// # Errors
///
/// Propagates gateway and token-normalization errors.
pub async fn google_login(gateway: &Gateway, credential: &GoogleCredential) -> Result<LoginEnvelope, ApiError> {
    let request = ApiRequest::post("/auth/google/")
        .json(credential.body())
        .without_refresh();
    let raw: Value = gateway.json(request).await?;
    normalize_login_response(&raw)
}

/// `POST /auth/registration/`
///
/// # Errors
///
/// Validation errors carry the server's field payload.
pub async fn register(gateway: &Gateway, registration: &Registration) -> Result<(), ApiError> {
    let request = ApiRequest::post("/auth/registration/")
        .json(to_body(registration)?)
        .without_refresh();
    gateway.execute(request).await
}

/// `GET /auth/user/`
///
/// # Errors
///
/// Propagates gateway errors.
pub async fn current_user(gateway: &Gateway) -> Result<UserSummary, ApiError> {
    gateway.json(ApiRequest::get("/auth/user/")).await
}

/// `POST /auth/logout/`
///
/// # Errors
///
/// Propagates gateway errors; callers treat them as best-effort.
pub async fn logout(gateway: &Gateway) -> Result<(), ApiError> {
    gateway
        .execute(ApiRequest::post("/auth/logout/").without_refresh())
        .await
}

/// `POST /auth/username/`
///
/// # Errors
///
/// Validation errors when the name is taken or malformed.
pub async fn claim_username(gateway: &Gateway, username: &str) -> Result<(), ApiError> {
    let request = ApiRequest::post("/auth/username/").json(json!({ "username": username }));
    gateway.execute(request).await
}

// =============================================================================
// PROFILES
// =============================================================================

/// `GET /profiles/{username}/`
///
/// # Errors
///
/// [`ApiError::NotFound`] for unknown users.
pub async fn profile(gateway: &Gateway, username: &str) -> Result<Profile, ApiError> {
    let path = format!("/profiles/{}/", urlencoding::encode(username));
    gateway.json(ApiRequest::get(path)).await
}

/// `PATCH /profiles/me/`
///
/// # Errors
///
/// Propagates gateway errors.
pub async fn update_my_profile(gateway: &Gateway, patch: &ProfilePatch) -> Result<Value, ApiError> {
    let request = ApiRequest::patch("/profiles/me/").json(to_body(patch)?);
    gateway.json(request).await
}

// =============================================================================
// CONNECTIONS
// =============================================================================

/// # Errors
///
/// Propagates gateway errors.
pub async fn my_connections(gateway: &Gateway) -> Result<Vec<Connection>, ApiError> {
    gateway.json(ApiRequest::get("/connections/my-connections/")).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn connection_requests(gateway: &Gateway) -> Result<Vec<ConnectionRequest>, ApiError> {
    gateway.json(ApiRequest::get("/connections/requests/")).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn send_connection_request(
    gateway: &Gateway,
    request: &SendConnectionRequest,
) -> Result<Value, ApiError> {
    let request = ApiRequest::post("/connections/requests/send/").json(to_body(request)?);
    gateway.json(request).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn respond_to_request(gateway: &Gateway, request_id: i64, action: RequestAction) -> Result<Ack, ApiError> {
    let request =
        ApiRequest::post(format!("/connections/requests/{request_id}/respond/")).json(json!({ "action": action }));
    gateway.json(request).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn interests(gateway: &Gateway) -> Result<Vec<Interest>, ApiError> {
    gateway.json(ApiRequest::get("/connections/interests/")).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn create_interest(gateway: &Gateway, interest: &NewInterest) -> Result<Interest, ApiError> {
    let request = ApiRequest::post("/connections/interests/").json(to_body(interest)?);
    gateway.json(request).await
}

// =============================================================================
// CIRCLES & HABITS
// =============================================================================

/// # Errors
///
/// Propagates gateway errors.
pub async fn my_circles(gateway: &Gateway) -> Result<Vec<Circle>, ApiError> {
    gateway.json(ApiRequest::get("/circles/my-circles/")).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn create_circle(gateway: &Gateway, circle: &NewCircle) -> Result<Value, ApiError> {
    let request = ApiRequest::post("/circles/create/").json(to_body(circle)?);
    gateway.json(request).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn habits(gateway: &Gateway) -> Result<Vec<Habit>, ApiError> {
    gateway.json(ApiRequest::get("/circles/habits/")).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn create_habit(gateway: &Gateway, habit: &NewHabit) -> Result<Habit, ApiError> {
    let request = ApiRequest::post("/circles/habits/").json(to_body(habit)?);
    gateway.json(request).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn update_habit(gateway: &Gateway, habit_id: i64, patch: &HabitPatch) -> Result<Habit, ApiError> {
    let request = ApiRequest::patch(format!("/circles/habits/{habit_id}/")).json(to_body(patch)?);
    gateway.json(request).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn delete_habit(gateway: &Gateway, habit_id: i64) -> Result<(), ApiError> {
    gateway
        .execute(ApiRequest::delete(format!("/circles/habits/{habit_id}/")))
        .await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn complete_habit(
    gateway: &Gateway,
    habit_id: i64,
    completion: &HabitCompletion,
) -> Result<CompletionResult, ApiError> {
    let request = ApiRequest::post(format!("/circles/habits/{habit_id}/complete/")).json(to_body(completion)?);
    gateway.json(request).await
}

// =============================================================================
// CONTENT
// =============================================================================

/// # Errors
///
/// Propagates gateway errors.
pub async fn feed(gateway: &Gateway, query: &FeedQuery) -> Result<Vec<Post>, ApiError> {
    let path = format!("/content/feed/?{}", query.query_string());
    gateway.json(ApiRequest::get(path)).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn create_post(gateway: &Gateway, post: &NewPost) -> Result<Value, ApiError> {
    let request = ApiRequest::post("/content/feed/").json(to_body(post)?);
    gateway.json(request).await
}

/// # Errors
///
/// Propagates gateway errors.
pub async fn toggle_like(gateway: &Gateway, post_id: i64) -> Result<LikeState, ApiError> {
    gateway
        .json(ApiRequest::post(format!("/content/posts/{post_id}/like/")))
        .await
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
