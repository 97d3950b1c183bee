#[cfg(test)]
#[path = "interests_test.rs"]
mod interests_test;

use std::sync::Arc;

use super::resource::{Resource, ResourceState};
use crate::error::ApiError;
use crate::net::api;
use crate::net::gateway::Gateway;
use crate::net::types::{Interest, NewInterest};

const FETCH_FAILED: &str = "Failed to fetch interests";

/// Interest catalogue. Created interests are appended locally.
#[derive(Clone)]
pub struct InterestsHook {
    gateway: Arc<Gateway>,
    cell: Resource<Vec<Interest>>,
}

impl InterestsHook {
    pub async fn mount(gateway: Arc<Gateway>) -> Self {
        let hook = Self::new(gateway);
        hook.refetch().await;
        hook
    }

    #[must_use]
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway, cell: Resource::new(Vec::new()) }
    }

    #[must_use]
    pub fn state(&self) -> ResourceState<Vec<Interest>> {
        self.cell.snapshot()
    }

    pub fn unmount(&self) {
        self.cell.unmount();
    }

    pub async fn refetch(&self) {
        self.cell.load(api::interests(&self.gateway), FETCH_FAILED).await;
    }

    /// # Errors
    ///
    /// Logged and returned; the local list is untouched.
    pub async fn create(&self, interest: &NewInterest) -> Result<Interest, ApiError> {
        let created = api::create_interest(&self.gateway, interest)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "creating interest failed"))?;
        let appended = created.clone();
        self.cell.update(move |interests| interests.push(appended));
        Ok(created)
    }
}
