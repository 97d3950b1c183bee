//! Shared `{data, loading, error}` cell behind every feature hook.
//!
//! A hook may be unmounted while one of its requests is still in flight.
//! Once unmounted, the cell ignores every write, so late results are
//! discarded instead of updating a view that no longer exists.

#[cfg(test)]
#[path = "resource_test.rs"]
mod resource_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ApiError;

/// Point-in-time view of a hook.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

/// Cloneable handle; clones share state and the mounted flag.
#[derive(Debug)]
pub struct Resource<T> {
    state: Arc<Mutex<ResourceState<T>>>,
    mounted: Arc<AtomicBool>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state), mounted: Arc::clone(&self.mounted) }
    }
}

impl<T: Clone> Resource<T> {
    /// A mounted cell in the loading state: hooks fetch on mount.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(ResourceState { data: initial, loading: true, error: None })),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ResourceState<T> {
        self.lock().clone()
    }

    #[must_use]
    pub fn data(&self) -> T {
        self.lock().data.clone()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Detach the cell; later writes become no-ops.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    pub fn begin(&self) {
        self.write(|s| s.loading = true);
    }

    /// Replace the data after a successful fetch and clear any error.
    pub fn resolve(&self, data: T) {
        self.write(|s| {
            s.data = data;
            s.error = None;
            s.loading = false;
        });
    }

    /// Record a fetch failure; existing data is kept.
    pub fn reject(&self, message: impl Into<String>) {
        let message = message.into();
        self.write(|s| {
            s.error = Some(message);
            s.loading = false;
        });
    }

    /// Run a fetch and store its outcome. Failures are logged and shown as
    /// `failure`; the underlying error is not surfaced.
    pub async fn load(&self, fetch: impl Future<Output = Result<T, ApiError>>, failure: &str) {
        self.begin();
        match fetch.await {
            Ok(data) => self.resolve(data),
            Err(e) => {
                tracing::error!(error = %e, "{failure}");
                self.reject(failure);
            }
        }
    }

    /// Patch the data in place (local merge after a mutation).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.write(|s| f(&mut s.data));
    }

    fn write(&self, f: impl FnOnce(&mut ResourceState<T>)) {
        if !self.is_mounted() {
            tracing::debug!("discarding result for unmounted hook");
            return;
        }
        f(&mut self.lock());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResourceState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
