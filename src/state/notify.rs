//! Transient UI notifications: `{loading, error, success_message}`.
//!
//! No queue. A new message overwrites the previous one. Success messages
//! clear themselves after a fixed delay; each message carries a generation
//! number so an older timer never clears a newer message.

#[cfg(test)]
#[path = "notify_test.rs"]
mod notify_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::ApiError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Notice {
    pub loading: bool,
    pub error: Option<String>,
    pub success_message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Notifications {
    state: Arc<Mutex<Notice>>,
    generation: Arc<AtomicU64>,
    ttl: Duration,
}

impl Notifications {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { state: Arc::new(Mutex::new(Notice::default())), generation: Arc::new(AtomicU64::new(0)), ttl }
    }

    #[must_use]
    pub fn snapshot(&self) -> Notice {
        self.lock().clone()
    }

    pub fn set_loading(&self, loading: bool) {
        self.lock().loading = loading;
    }

    /// Show an error. Also ends any loading indicator.
    pub fn set_error(&self, error: impl Into<String>) {
        let mut state = self.lock();
        state.error = Some(error.into());
        state.loading = false;
    }

    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    /// Show a success message and schedule its removal after the TTL.
    ///
    /// Outside a tokio runtime the message stays until cleared.
    pub fn set_success(&self, message: impl Into<String>) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.lock().success_message = Some(message.into());

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime; success message will not auto-clear");
            return;
        };
        let this = self.clone();
        runtime.spawn(async move {
            tokio::time::sleep(this.ttl).await;
            if this.generation.load(Ordering::Acquire) == generation {
                this.lock().success_message = None;
            }
        });
    }

    pub fn clear_success(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.lock().success_message = None;
    }

    /// Run a mutation behind the loading flag and report how it went:
    /// `success` when it resolves, the error's user message when it fails.
    /// The result is handed back unchanged.
    ///
    /// # Errors
    ///
    /// Whatever `work` returns.
    pub async fn track<T>(
        &self,
        work: impl Future<Output = Result<T, ApiError>>,
        success: &str,
    ) -> Result<T, ApiError> {
        self.clear_error();
        self.set_loading(true);
        let result = work.await;
        match &result {
            Ok(_) => {
                self.set_loading(false);
                self.set_success(success);
            }
            Err(e) => self.set_error(e.user_message()),
        }
        result
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Notice> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
