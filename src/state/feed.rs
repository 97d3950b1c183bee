//! Feed hook: posts for the current [`FeedQuery`].
//!
//! Changing the query, posting, and liking all refetch; the feed order and
//! like counts are the server's to decide.

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use super::resource::{Resource, ResourceState};
use crate::error::ApiError;
use crate::net::api;
use crate::net::gateway::Gateway;
use crate::net::types::{FeedQuery, LikeState, NewPost, Post};

const FETCH_FAILED: &str = "Failed to fetch posts";

#[derive(Clone)]
pub struct FeedHook {
    gateway: Arc<Gateway>,
    query: Arc<Mutex<FeedQuery>>,
    cell: Resource<Vec<Post>>,
}

impl FeedHook {
    pub async fn mount(gateway: Arc<Gateway>, query: FeedQuery) -> Self {
        let hook = Self::new(gateway, query);
        hook.refetch().await;
        hook
    }

    #[must_use]
    pub fn new(gateway: Arc<Gateway>, query: FeedQuery) -> Self {
        Self { gateway, query: Arc::new(Mutex::new(query)), cell: Resource::new(Vec::new()) }
    }

    #[must_use]
    pub fn state(&self) -> ResourceState<Vec<Post>> {
        self.cell.snapshot()
    }

    #[must_use]
    pub fn query(&self) -> FeedQuery {
        self.query.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn unmount(&self) {
        self.cell.unmount();
    }

    pub async fn refetch(&self) {
        let query = self.query();
        self.cell.load(api::feed(&self.gateway, &query), FETCH_FAILED).await;
    }

    /// Switch scope or interest filter and reload.
    pub async fn set_query(&self, query: FeedQuery) {
        *self.query.lock().unwrap_or_else(PoisonError::into_inner) = query;
        self.refetch().await;
    }

    /// # Errors
    ///
    /// Logged and returned; no refetch happens.
    pub async fn create_post(&self, post: &NewPost) -> Result<Value, ApiError> {
        let created = api::create_post(&self.gateway, post)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "creating post failed"))?;
        self.refetch().await;
        Ok(created)
    }

    /// # Errors
    ///
    /// Logged and returned; no refetch happens.
    pub async fn toggle_like(&self, post_id: i64) -> Result<LikeState, ApiError> {
        let state = api::toggle_like(&self.gateway, post_id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, post_id, "liking post failed"))?;
        self.refetch().await;
        Ok(state)
    }
}
