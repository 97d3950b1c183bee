//! Client-side state: the session, transient notices, and one data hook per
//! feature.
//!
//! Hooks follow one shape: `mount` fetches, `state()` returns a
//! `{data, loading, error}` snapshot, mutations return `Result` and either
//! refetch or patch the local list, and `unmount` detaches the hook so late
//! responses are dropped.

pub mod circles;
pub mod connections;
pub mod feed;
pub mod habits;
pub mod interests;
pub mod notify;
pub mod profile;
pub mod resource;
pub mod session;
