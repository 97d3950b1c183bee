//! Minsoto API client.
//!
//! DESIGN
//! ======
//! Everything the application knows lives server-side behind the REST API.
//! This crate is the client half: a token store, a single request gateway
//! that attaches bearer tokens and performs the 401 refresh-and-retry dance,
//! a session controller that owns the authentication lifecycle, and one
//! small data hook per feature domain (connections, habits, interests,
//! circles, feed, profiles).
//!
//! LAYERS
//! ======
//! - `storage`: durable `accessToken` / `refreshToken` persistence.
//! - `net`: transport seam, per-request refresh state machine, gateway,
//!   wire DTOs and typed endpoint calls.
//! - `state`: session controller, transient notifications, feature hooks.
//! - `routes`: navigation targets and the `Navigator` capability.

pub mod config;
pub mod error;
pub mod net;
pub mod routes;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{ClientConfig, ConfigError, GoogleOAuth};
pub use error::{ApiError, FieldErrors};
pub use net::gateway::Gateway;
pub use net::tokens::{TokenPair, normalize_token_response};
pub use net::transport::{ReqwestTransport, Transport};
pub use routes::{Navigator, Route};
pub use state::session::{AuthOutcome, GoogleCredential, Session, SessionController};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenKey, TokenStore};
