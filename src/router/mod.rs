//! HTTP router task.
//!
//! Other tasks obtain the router from the provider during their own
//! construction and register handlers and middleware on it:
//!
//! ```text
//! gateway plugin ──get_or_new(RouterConfig)──► Arc<Router>
//!                ──add_handler("/auth", regex, handler, [GET, POST])
//!                ──add_middleware("token", mw) / set_middleware("/auth", ["token"])
//!
//! request ─► Router::handle ─► dispatch(method, path)
//!                                ├─► cache (method+path)
//!                                └─► scan: longest prefix, matcher before wildcard
//!                             ─► 404 / 405 JSON body, or chain ─► handler
//!
//! socket ─► HttpServer (axum) ─► Router::handle
//! ```
//!
//! ## Contents
//! - [`Router`] dispatch table, also a [`Task`](crate::Task)
//! - [`RouterConfig`] its plugin
//! - [`HttpServer`] / [`HttpServerConfig`] listener that serves a router
//! - [`Handler`], [`Middleware`] and the `*_fn` constructors
//! - [`RouteParams`] request extension with the prefix and captures
//! - response helpers with the JSON error body

mod middleware;
mod plugin;
mod response;
mod route;
#[allow(clippy::module_inception)]
mod router;
mod server;

pub use middleware::{Middleware, middleware_fn};
pub use plugin::{ROUTER_NAME, RouterConfig};
pub use response::{
    CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT, error_response, json_response, text_response,
};
pub use route::{Handler, Request, Response, RouteInfo, RouteParams, handler_fn};
pub use router::{Dispatch, RouteMatch, Router};
pub use server::{
    DEFAULT_LISTEN, DEFAULT_TIMEOUT_MS, HTTP_SERVER_NAME, HttpServer, HttpServerConfig,
};
