//! Per-request refresh/retry state machine.
//!
//! ```text
//!            non-401                         any status
//!   Sent ─────────────▶ Ok          Retried ───────────▶ Retried (deliver)
//!    │ 401 (first)                     ▲
//!    ▼                                 │ refresh ok / token already rotated
//!   UnauthorizedFirst ──▶ Refreshing ──┘
//!    │ no refresh token     │ refresh failed
//!    ▼                      ▼
//!   Failed(original)      Failed(refresh)
//! ```
//!
//! Every request gets a budget of one retry. A 401 on the retried request
//! is delivered as-is and never starts a second refresh.

#[cfg(test)]
#[path = "phase_test.rs"]
mod phase_test;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestPhase {
    /// Original request sent, no response yet.
    Sent,
    /// Response delivered without any refresh.
    Ok,
    /// First 401 received; deciding whether a refresh is possible.
    UnauthorizedFirst,
    /// Refresh endpoint call in flight.
    Refreshing,
    /// Original request re-issued with a new access token.
    Retried,
    /// Session could not be recovered; tokens must be cleared.
    Failed,
}

/// Which error the caller receives when the machine fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailCause {
    /// No refresh token: propagate the original 401.
    Original,
    /// Refresh call failed: propagate the refresh error.
    Refresh,
}

/// What the driver must do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Hand the latest response to the caller.
    Deliver,
    /// Look up the refresh token (or a token rotated by another request).
    CheckRefresh,
    /// Call the refresh endpoint.
    Refresh,
    /// Re-issue the original request with the current access token.
    Retry,
    /// Clear tokens, navigate to login, propagate the given error.
    Fail(FailCause),
}

#[derive(Clone, Copy, Debug)]
pub struct RequestMachine {
    phase: RequestPhase,
    retried: bool,
    refresh_allowed: bool,
}

impl RequestMachine {
    #[must_use]
    pub const fn new(refresh_allowed: bool) -> Self {
        Self { phase: RequestPhase::Sent, retried: false, refresh_allowed }
    }

    #[must_use]
    pub const fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// `true` once the single retry budget has been spent.
    #[must_use]
    pub const fn retried(&self) -> bool {
        self.retried
    }

    /// A response arrived for the original or the retried request.
    pub fn on_response(&mut self, status: u16) -> Step {
        match self.phase {
            RequestPhase::Sent if status == 401 && self.refresh_allowed && !self.retried => {
                self.retried = true;
                self.phase = RequestPhase::UnauthorizedFirst;
                Step::CheckRefresh
            }
            RequestPhase::Sent => {
                self.phase = RequestPhase::Ok;
                Step::Deliver
            }
            _ => Step::Deliver,
        }
    }

    /// Another request already replaced the access token this request was
    /// sent with; retry with it instead of refreshing again.
    pub fn on_token_rotated(&mut self) -> Step {
        if self.phase != RequestPhase::UnauthorizedFirst {
            return Step::Deliver;
        }
        self.phase = RequestPhase::Retried;
        Step::Retry
    }

    /// Result of looking up the stored refresh token.
    pub fn on_refresh_token(&mut self, present: bool) -> Step {
        if self.phase != RequestPhase::UnauthorizedFirst {
            return Step::Deliver;
        }
        if present {
            self.phase = RequestPhase::Refreshing;
            Step::Refresh
        } else {
            self.phase = RequestPhase::Failed;
            Step::Fail(FailCause::Original)
        }
    }

    /// Outcome of the refresh endpoint call.
    pub fn on_refresh_result(&mut self, succeeded: bool) -> Step {
        if self.phase != RequestPhase::Refreshing {
            return Step::Deliver;
        }
        if succeeded {
            self.phase = RequestPhase::Retried;
            Step::Retry
        } else {
            self.phase = RequestPhase::Failed;
            Step::Fail(FailCause::Refresh)
        }
    }
}
