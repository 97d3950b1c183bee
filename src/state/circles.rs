#[cfg(test)]
#[path = "circles_test.rs"]
mod circles_test;

use std::sync::Arc;

use serde_json::Value;

use super::resource::{Resource, ResourceState};
use crate::error::ApiError;
use crate::net::api;
use crate::net::gateway::Gateway;
use crate::net::types::{Circle, NewCircle};

const FETCH_FAILED: &str = "Failed to fetch circles";

/// Circles the user belongs to. Creating one refetches the list.
#[derive(Clone)]
pub struct CirclesHook {
    gateway: Arc<Gateway>,
    cell: Resource<Vec<Circle>>,
}

impl CirclesHook {
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
    pub fn state(&self) -> ResourceState<Vec<Circle>> {
        self.cell.snapshot()
    }

    pub fn unmount(&self) {
        self.cell.unmount();
    }

    pub async fn refetch(&self) {
        self.cell.load(api::my_circles(&self.gateway), FETCH_FAILED).await;
    }

    /// # Errors
    ///
    /// Logged and returned; no refetch happens.
    pub async fn create(&self, circle: &NewCircle) -> Result<Value, ApiError> {
        let created = api::create_circle(&self.gateway, circle)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "creating circle failed"))?;
        self.refetch().await;
        Ok(created)
    }
}
