//! Public profile lookup. A missing user is an inline state, not an error.

#[cfg(test)]
#[path = "profile_test.rs"]
mod profile_test;

use std::sync::Arc;

use super::resource::{Resource, ResourceState};
use crate::error::ApiError;
use crate::net::api;
use crate::net::gateway::Gateway;
use crate::net::types::{Profile, ProfilePatch};

const FETCH_FAILED: &str = "Failed to load profile";

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ProfileView {
    #[default]
    Pending,
    Loaded(Box<Profile>),
    NotFound,
}

#[derive(Clone)]
pub struct ProfileHook {
    gateway: Arc<Gateway>,
    cell: Resource<ProfileView>,
}

impl ProfileHook {
    pub async fn mount(gateway: Arc<Gateway>, username: &str) -> Self {
        let hook = Self::new(gateway);
        hook.load(username).await;
        hook
    }

    #[must_use]
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway, cell: Resource::new(ProfileView::Pending) }
    }

    #[must_use]
    pub fn state(&self) -> ResourceState<ProfileView> {
        self.cell.snapshot()
    }

    pub fn unmount(&self) {
        self.cell.unmount();
    }

    pub async fn load(&self, username: &str) {
        let fetch = async {
            match api::profile(&self.gateway, username).await {
                Ok(profile) => Ok(ProfileView::Loaded(Box::new(profile))),
                Err(ApiError::NotFound) => Ok(ProfileView::NotFound),
                Err(e) => Err(e),
            }
        };
        self.cell.load(fetch, FETCH_FAILED).await;
    }

    /// Save changes to the signed-in user's own profile, e.g. a new
    /// `widget_layout`.
    ///
    /// # Errors
    ///
    /// Logged and returned.
    pub async fn save_mine(&self, patch: &ProfilePatch) -> Result<(), ApiError> {
        api::update_my_profile(&self.gateway, patch)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "saving profile failed"))?;
        Ok(())
    }
}
