//! Scripted transport for tests
//!
//! Routes match on method and the trailing path segments of the request URL. Unmatched
//! requests get a 404. A route can be held behind a [`Gate`] so a test can keep a worker
//! busy while it queues more work.

use crate::request::{Request, Response};
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use http::Method;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};

/// Blocks held requests until opened
#[derive(Debug, Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // Sender lives in self, so the channel cannot close while waiting
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[derive(Clone)]
enum Reply {
    Respond(Response),
    Fail(TransportError),
}

struct Route {
    method: Method,
    path: String,
    reply: Reply,
    gate: Option<Gate>,
    delay: Option<Duration>,
}

impl Route {
    fn matches(&self, request: &Request) -> bool {
        if request.method != self.method {
            return false;
        }
        let path = request.path();
        let path = path.trim_matches('/');
        path == self.path || path.ends_with(&format!("/{}", self.path))
    }
}

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<Request>>,
    called: Notify,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, method: Method, path: &str, reply: Reply) -> &Self {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).push(Route {
            method,
            path: path.trim_matches('/').to_string(),
            reply,
            gate: None,
            delay: None,
        });
        self
    }

    /// Answer `method path` with `response`. Later routes win over earlier ones.
    pub fn on(&self, method: Method, path: &str, response: Response) -> &Self {
        self.add(method, path, Reply::Respond(response))
    }

    /// Fail `method path` at the transport level
    pub fn fail(&self, method: Method, path: &str, error: TransportError) -> &Self {
        self.add(method, path, Reply::Fail(error))
    }

    /// Hold `method path` until the returned gate is opened
    pub fn hold(&self, method: Method, path: &str, response: Response) -> Gate {
        let gate = Gate::new();
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).push(Route {
            method,
            path: path.trim_matches('/').to_string(),
            reply: Reply::Respond(response),
            gate: Some(gate.clone()),
            delay: None,
        });
        gate
    }

    /// Answer `method path` after sleeping for `delay`
    pub fn delayed(&self, method: Method, path: &str, response: Response, delay: Duration) -> &Self {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).push(Route {
            method,
            path: path.trim_matches('/').to_string(),
            reply: Reply::Respond(response),
            gate: None,
            delay: Some(delay),
        });
        self
    }

    /// Every request received so far, in arrival order
    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Paths of every request received so far, in arrival order
    pub fn paths(&self) -> Vec<String> {
        self.calls().iter().map(Request::path).collect()
    }

    /// Wait until at least `n` requests have arrived
    pub async fn wait_for_calls(&self, n: usize) {
        loop {
            let notified = self.called.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.call_count() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let (reply, gate, delay) = {
            let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            match routes.iter().rev().find(|r| r.matches(&request)) {
                Some(route) => (route.reply.clone(), route.gate.clone(), route.delay),
                None => (Reply::Respond(Response::new(404, "")), None, None),
            }
        };

        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(request);
        self.called.notify_waiters();

        if let Some(gate) = gate {
            gate.wait().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(error) => Err(error),
        }
    }
}
