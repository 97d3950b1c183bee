//! Wire DTOs for the REST API.
//!
//! DESIGN
//! ======
//! The server owns every entity here; the client holds no authoritative
//! copy. Response types tolerate missing optional fields with
//! `#[serde(default)]` and ignore unknown fields so server-side additions do
//! not break decoding. Request bodies skip absent optionals so PATCH calls
//! only send what changed.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// USERS & PROFILES
// =============================================================================

/// Server-owned projection of the signed-in user.
///
/// Opaque to the client apart from `username_is_default`, which decides the
/// one-time post-registration redirect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(alias = "pk")]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile: Option<Value>,
    #[serde(default)]
    pub username_is_default: bool,
}

/// Partial update merged into the in-memory [`UserSummary`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub profile: Option<Value>,
}

impl UserSummary {
    /// Merge a partial update. Profile objects are merged key by key.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(username) = patch.username {
            self.username = username;
            self.username_is_default = false;
        }
        match (patch.profile, self.profile.as_mut()) {
            (Some(Value::Object(incoming)), Some(Value::Object(existing))) => {
                existing.extend(incoming);
            }
            (Some(incoming), _) => self.profile = Some(incoming),
            (None, _) => {}
        }
    }
}

/// Minimal user projection embedded in connections, circles and posts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Profile fields. The server has sent them both at top level and nested
/// under `profile`, so every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDetails {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub theme_color: Option<String>,
    #[serde(default)]
    pub widget_layout: Option<Value>,
    #[serde(default)]
    pub active_widgets: Option<Vec<Value>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub profile: Option<ProfileDetails>,
    #[serde(flatten)]
    pub top_level: ProfileDetails,
}

impl Profile {
    /// Nested details when present, otherwise the top-level fields.
    #[must_use]
    pub fn details(&self) -> &ProfileDetails {
        self.profile.as_ref().unwrap_or(&self.top_level)
    }
}

/// `PATCH /profiles/me/` body. `widget_layout` is an opaque blob.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget_layout: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_widgets: Option<Vec<Value>>,
}

impl ProfilePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// AUTH PAYLOADS
// =============================================================================

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password2: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// CONNECTIONS & INTERESTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NewInterest {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Kind of relationship a request asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    #[default]
    Connection,
    Friend,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub id: i64,
    pub sender: PublicUser,
    pub receiver: PublicUser,
    pub request_type: RequestType,
    #[serde(default)]
    pub interest: Option<Interest>,
    pub status: RequestStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,
    /// The other party of the connection.
    pub user: PublicUser,
    pub connection_type: RequestType,
    #[serde(default)]
    pub interests: Vec<Interest>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SendConnectionRequest {
    pub receiver_id: i64,
    pub request_type: RequestType,
    pub interest_id: Option<i64>,
    pub message: String,
}

/// Answer to a pending connection request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestAction {
    Accept,
    Decline,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<String>,
}

// =============================================================================
// CIRCLES & HABITS
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircleType {
    #[default]
    Project,
    Habit,
    Learning,
    Accountability,
    Social,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub circle_type: CircleType,
    #[serde(default)]
    pub creator: Option<PublicUser>,
    #[serde(default)]
    pub interests: Vec<Interest>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub max_members: u32,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub is_member: bool,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewCircle {
    pub name: String,
    pub description: String,
    pub circle_type: CircleType,
    pub is_private: bool,
    pub max_members: u32,
    /// Interest ids.
    pub interests: Vec<i64>,
}

impl Default for NewCircle {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            circle_type: CircleType::Project,
            is_private: false,
            max_members: 10,
            interests: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_frequency")]
    pub target_frequency: u32,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_public: bool,
    /// Last 30 days, ISO date -> completed.
    #[serde(default)]
    pub streak_data: BTreeMap<String, bool>,
    #[serde(default)]
    pub created_at: String,
}

fn default_frequency() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewHabit {
    pub name: String,
    pub description: String,
    pub target_frequency: u32,
    pub is_public: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HabitPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_frequency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// `POST /circles/habits/{id}/complete/` body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HabitCompletion {
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub notes: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct HabitStreak {
    #[serde(default)]
    pub current_streak: Option<u32>,
    #[serde(default)]
    pub best_streak: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CompletionResult {
    #[serde(default)]
    pub habit: Option<HabitStreak>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// CONTENT
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    #[default]
    Global,
    Connections,
}

impl FeedType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Connections => "connections",
        }
    }
}

/// Feed selector: scope plus an interest-name filter (`"all"` for none).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedQuery {
    pub feed_type: FeedType,
    pub filter: String,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self { feed_type: FeedType::Global, filter: "all".to_owned() }
    }
}

impl FeedQuery {
    #[must_use]
    pub fn query_string(&self) -> String {
        format!(
            "feed_type={}&filter={}",
            self.feed_type.as_str(),
            urlencoding::encode(&self.filter)
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Text,
    Image,
    Progress,
    Achievement,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Connections,
    Friends,
    Circle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author: PublicUser,
    pub content: String,
    #[serde(default)]
    pub post_type: PostType,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub interests: Vec<Interest>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub is_highlighted: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default)]
    pub is_liked: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NewPost {
    pub content: String,
    pub post_type: PostType,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image_url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct LikeState {
    pub liked: bool,
}
