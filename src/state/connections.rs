//! Connections hook: my connections plus pending requests.
//!
//! Both lists are fetched in parallel. Sending or answering a request
//! refetches both, since the server decides what either list now holds.

#[cfg(test)]
#[path = "connections_test.rs"]
mod connections_test;

use std::sync::Arc;

use serde_json::Value;

use super::resource::{Resource, ResourceState};
use crate::error::ApiError;
use crate::net::api;
use crate::net::gateway::Gateway;
use crate::net::types::{Ack, Connection, ConnectionRequest, RequestAction, RequestType, SendConnectionRequest};

const FETCH_FAILED: &str = "Failed to fetch connections";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionsData {
    pub connections: Vec<Connection>,
    pub requests: Vec<ConnectionRequest>,
}

#[derive(Clone)]
pub struct ConnectionsHook {
    gateway: Arc<Gateway>,
    cell: Resource<ConnectionsData>,
}

impl ConnectionsHook {
    /// Create and run the initial fetch.
    pub async fn mount(gateway: Arc<Gateway>) -> Self {
        let hook = Self::new(gateway);
        hook.refetch().await;
        hook
    }

    /// Create without fetching; the state reads as loading.
    #[must_use]
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway, cell: Resource::new(ConnectionsData::default()) }
    }

    #[must_use]
    pub fn state(&self) -> ResourceState<ConnectionsData> {
        self.cell.snapshot()
    }

    pub fn unmount(&self) {
        self.cell.unmount();
    }

    pub async fn refetch(&self) {
        let gateway = &self.gateway;
        let fetch = async {
            let (connections, requests) =
                futures::future::try_join(api::my_connections(gateway), api::connection_requests(gateway)).await?;
            Ok::<_, ApiError>(ConnectionsData { connections, requests })
        };
        self.cell.load(fetch, FETCH_FAILED).await;
    }

    /// # Errors
    ///
    /// The send error is logged and returned; no refetch happens.
    pub async fn send_request(
        &self,
        receiver_id: i64,
        request_type: RequestType,
        interest_id: Option<i64>,
        message: &str,
    ) -> Result<Value, ApiError> {
        let request = SendConnectionRequest { receiver_id, request_type, interest_id, message: message.to_owned() };
        let sent = api::send_connection_request(&self.gateway, &request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, receiver_id, "sending connection request failed"))?;
        self.refetch().await;
        Ok(sent)
    }

    /// # Errors
    ///
    /// The respond error is logged and returned; no refetch happens.
    pub async fn respond(&self, request_id: i64, action: RequestAction) -> Result<Ack, ApiError> {
        let ack = api::respond_to_request(&self.gateway, request_id, action)
            .await
            .inspect_err(|e| tracing::error!(error = %e, request_id, "responding to request failed"))?;
        self.refetch().await;
        Ok(ack)
    }
}
