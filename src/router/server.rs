//! HTTP listener in front of a [`Router`].
//!
//! ```text
//! HttpServerConfig::new_task
//!   ├─► get_or_new(RouterConfig { label: router })   shared with gateways
//!   └─► bind(listen)                                  errors surface at construction
//!
//! HttpServer::run(ctx)
//!   └─► axum::serve(listener, fallback ─► Router::handle)
//!         └─► ctx cancelled ─► graceful shutdown ─► Ok(())
//! ```
//!
//! Request bodies are read in full before dispatch, bounded by the configured
//! timeout (`408` when it elapses, `400` when the body stream fails).

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use http::StatusCode;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::plugin::{ROUTER_NAME, RouterConfig};
use super::response::error_response;
use super::router::Router;
use crate::core::Provider;
use crate::error::{Error, TaskError};
use crate::identifier::is_identifier;
use crate::tasks::{Task, TaskPlugin};

/// Plugin name, and the label used when none is configured.
pub const HTTP_SERVER_NAME: &str = "httpserver";

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Default request read timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Configuration for an [`HttpServer`] task.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpServerConfig {
    /// Instance label (`""` = `httpserver`).
    pub label: String,
    /// Label of the router to serve (`""` = `router`).
    pub router: String,
    /// Socket address to bind, e.g. `0.0.0.0:8080` (port `0` = any free port).
    pub listen: String,
    /// Request body read timeout in milliseconds (`0` = default).
    pub timeout_ms: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            router: String::new(),
            listen: DEFAULT_LISTEN.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl HttpServerConfig {
    fn router_label(&self) -> &str {
        if self.router.is_empty() {
            ROUTER_NAME
        } else {
            &self.router
        }
    }

    fn timeout(&self) -> Duration {
        match self.timeout_ms {
            0 => Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }
}

impl TaskPlugin for HttpServerConfig {
    type Task = HttpServer;

    fn name(&self) -> &str {
        HTTP_SERVER_NAME
    }

    fn label(&self) -> &str {
        if self.label.is_empty() {
            HTTP_SERVER_NAME
        } else {
            &self.label
        }
    }

    fn new_task(
        self,
        ctx: &CancellationToken,
        provider: &mut Provider,
    ) -> Result<Arc<HttpServer>, Error> {
        let label = self.label().to_owned();
        if !is_identifier(&label) {
            return Err(Error::BadParameter(format!("label: {label:?}")));
        }
        let router = provider.get_or_new(
            ctx,
            RouterConfig {
                label: self.router_label().to_owned(),
            },
        )?;

        let listener = TcpListener::bind(&self.listen)
            .and_then(|l| l.set_nonblocking(true).map(|()| l))
            .map_err(|e| Error::BadParameter(format!("listen {:?}: {e}", self.listen)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| Error::BadParameter(format!("listen {:?}: {e}", self.listen)))?;
        debug!(server = %label, %addr, router = router.label(), "listener bound");

        Ok(Arc::new(HttpServer {
            label,
            addr,
            timeout: self.timeout(),
            router,
            listener: Mutex::new(Some(listener)),
        }))
    }
}

/// Serves one [`Router`] over HTTP/1.1 until cancellation.
pub struct HttpServer {
    label: String,
    addr: SocketAddr,
    timeout: Duration,
    router: Arc<Router>,
    listener: Mutex<Option<TcpListener>>,
}

impl HttpServer {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Router the server dispatches to.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }
}

#[derive(Clone)]
struct Shared {
    router: Arc<Router>,
    timeout: Duration,
}

async fn forward(
    State(shared): State<Shared>,
    req: axum::extract::Request,
) -> axum::response::Response {
    let (parts, body) = req.into_parts();
    let read = axum::body::to_bytes(body, usize::MAX);
    let bytes = match tokio::time::timeout(shared.timeout, read).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            debug!(error = %e, "request body");
            return error_response(StatusCode::BAD_REQUEST).map(Body::from);
        }
        Err(_) => return error_response(StatusCode::REQUEST_TIMEOUT).map(Body::from),
    };
    let res = shared.router.handle(http::Request::from_parts(parts, bytes)).await;
    res.map(Body::from)
}

#[async_trait]
impl Task for HttpServer {
    fn label(&self) -> &str {
        &self.label
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        let Some(listener) = self.listener.lock().take() else {
            return Err(TaskError::Fatal {
                error: format!("httpserver {} already served", self.label),
            });
        };
        let listener = tokio::net::TcpListener::from_std(listener).map_err(TaskError::fail)?;

        let app = axum::Router::new().fallback(forward).with_state(Shared {
            router: Arc::clone(&self.router),
            timeout: self.timeout,
        });

        info!(server = %self.label, addr = %self.addr, "http server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { ctx.cancelled().await })
            .await
            .map_err(TaskError::fail)?;
        info!(server = %self.label, "http server stopped");
        Ok(())
    }
}

impl std::fmt::Display for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<httpserver label={:?} addr={} read_timeout={:?} router={:?}>",
            self.label,
            self.addr,
            self.timeout,
            self.router.label()
        )
    }
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("label", &self.label)
            .field("addr", &self.addr)
            .field("timeout", &self.timeout)
            .field("router", &self.router.label())
            .finish()
    }
}
