//! Mock HTTP transport for testing.
//!
//! Replies are scripted per route (method + path). Every request is recorded
//! so tests can assert on headers and call counts, and a route can be held
//! behind a [`Gate`] to stage races between concurrent calls.

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use boxoffice_core::error::NetworkError;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, Semaphore};

/// Scripted outcome of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Answer with a status and body
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: Vec<u8>,
    },
    /// Fail in the transport
    Network(NetworkError),
}

impl Reply {
    /// Empty-bodied reply with `status`
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self::Status {
            status,
            body: Vec::new(),
        }
    }

    /// 200 with `value` serialized as JSON
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        Self::Status {
            status: 200,
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    /// Reply with `status` and a raw text body
    #[must_use]
    pub fn text(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    /// Connection refused
    #[must_use]
    pub fn offline() -> Self {
        Self::Network(NetworkError::Connect("connection refused".to_string()))
    }

    fn into_result(self) -> Result<HttpResponse, NetworkError> {
        match self {
            Self::Status { status, body } => Ok(HttpResponse { status, body }),
            Self::Network(error) => Err(error),
        }
    }
}

/// Holds requests to a route until permits are released.
#[derive(Clone, Debug)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    /// Let `n` waiting (or future) requests through.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

#[derive(Default)]
struct Route {
    queued: VecDeque<Reply>,
    fallback: Option<Reply>,
    gate: Option<Arc<Semaphore>>,
}

#[derive(Default)]
struct State {
    routes: Mutex<HashMap<(Method, String), Route>>,
    calls: Mutex<Vec<HttpRequest>>,
    called: Notify,
}

/// Scripted [`HttpTransport`].
///
/// Unscripted routes answer 404. Clones share scripts and recorded calls.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<State>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &lock(&self.state.calls).len())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Create a transport with no scripted routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request to `method path` with `reply`.
    pub fn respond(&self, method: Method, path: &str, reply: Reply) {
        self.route(method, path, |route| route.fallback = Some(reply));
    }

    /// Answer the next request to `method path` with `reply`.
    ///
    /// Queued replies are used in order before the route's default.
    pub fn respond_once(&self, method: Method, path: &str, reply: Reply) {
        self.route(method, path, |route| route.queued.push_back(reply));
    }

    /// Hold requests to `method path` until the returned gate releases them.
    ///
    /// Held requests are already recorded, so [`MockTransport::wait_for_calls`]
    /// sees them.
    #[must_use]
    pub fn gate(&self, method: Method, path: &str) -> Gate {
        let permits = Arc::new(Semaphore::new(0));
        let shared = Arc::clone(&permits);
        self.route(method, path, |route| route.gate = Some(shared));
        Gate { permits }
    }

    /// Every request sent so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.state.calls).clone()
    }

    /// Number of requests sent to `method path`
    #[must_use]
    pub fn count(&self, method: &Method, path: &str) -> usize {
        lock(&self.state.calls)
            .iter()
            .filter(|request| request.method == *method && request.path() == path)
            .count()
    }

    /// Wait until at least `n` requests have been sent to `method path`.
    pub async fn wait_for_calls(&self, method: &Method, path: &str, n: usize) {
        loop {
            let called = self.state.called.notified();
            if self.count(method, path) >= n {
                return;
            }
            called.await;
        }
    }

    fn route(&self, method: Method, path: &str, apply: impl FnOnce(&mut Route)) {
        let mut routes = lock(&self.state.routes);
        apply(routes.entry((method, path.to_string())).or_default());
    }
}

impl HttpTransport for MockTransport {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, NetworkError>> + Send {
        let state = Arc::clone(&self.state);

        async move {
            let key = (request.method.clone(), request.path());
            let (reply, gate) = {
                let mut routes = lock(&state.routes);
                match routes.get_mut(&key) {
                    Some(route) => {
                        let reply = route
                            .queued
                            .pop_front()
                            .or_else(|| route.fallback.clone())
                            .unwrap_or(Reply::status(404));
                        (reply, route.gate.clone())
                    }
                    None => (Reply::status(404), None),
                }
            };

            lock(&state.calls).push(request);
            state.called.notify_waiters();

            if let Some(gate) = gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }

            reply.into_result()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
