//! Networking: transport seam, refresh state machine, gateway, wire types.
//!
//! DESIGN
//! ======
//! `transport` is the only place that touches the HTTP stack. Everything
//! above it (`phase`, `gateway`, `api`) is testable with a scripted mock
//! transport, which keeps the refresh/retry transitions unit-testable.

pub mod api;
pub mod gateway;
pub mod phase;
pub mod tokens;
pub mod transport;
pub mod types;
