//! Shared test fixtures: scripted transport, recording navigator.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::net::gateway::Gateway;
use crate::net::transport::{ApiRequest, ApiResponse, Transport, TransportError};
use crate::routes::{Navigator, Route};
use crate::storage::MemoryTokenStore;

// =========================================================================
// MockTransport
// =========================================================================

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync>;

/// One request as the transport saw it.
#[derive(Clone, Debug)]
pub struct Call {
    pub method: String,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

/// Transport answering from a closure and recording every call.
///
/// With `yielding`, each send yields to the scheduler once before
/// answering so concurrent requests interleave.
pub struct MockTransport {
    handler: Handler,
    calls: Mutex<Vec<Call>>,
    yielding: bool,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self { handler: Box::new(handler), calls: Mutex::new(Vec::new()), yielding: false }
    }

    /// Answer with `(status, body)` from a closure that cannot fail.
    pub fn responding(handler: impl Fn(&ApiRequest) -> (u16, Value) + Send + Sync + 'static) -> Self {
        Self::new(move |req| {
            let (status, body) = handler(req);
            Ok(response(status, &body))
        })
    }

    pub fn yielding(mut self) -> Self {
        self.yielding = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls.lock().unwrap().push(Call {
            method: request.method.to_string(),
            path: request.path.clone(),
            bearer: request.bearer.clone(),
            body: request.body.clone(),
        });
        if self.yielding {
            tokio::task::yield_now().await;
        }
        (self.handler)(request)
    }
}

pub fn response(status: u16, body: &Value) -> ApiResponse {
    let body = if body.is_null() { String::new() } else { body.to_string() };
    ApiResponse { status, body }
}

// =========================================================================
// RecordingNavigator
// =========================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.routes().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

// =========================================================================
// Wiring
// =========================================================================

/// Gateway plus handles to its collaborators.
pub struct Harness {
    pub gateway: Arc<Gateway>,
    pub transport: Arc<MockTransport>,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn harness(transport: MockTransport, access: Option<&str>, refresh: Option<&str>) -> Harness {
    let transport = Arc::new(transport);
    let store = Arc::new(MemoryTokenStore::with_tokens(access, refresh));
    let navigator = Arc::new(RecordingNavigator::default());
    let gateway = Arc::new(Gateway::new(transport.clone(), store.clone(), navigator.clone()));
    Harness { gateway, transport, store, navigator }
}

pub fn user_json(username: &str, username_is_default: bool) -> Value {
    json!({
        "id": 7,
        "username": username,
        "email": format!("{username}@example.com"),
        "first_name": "Test",
        "last_name": "User",
        "username_is_default": username_is_default
    })
}
