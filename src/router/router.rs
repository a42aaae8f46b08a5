//! Prefix/regex dispatch table with a lookup cache and middleware chains.
//!
//! ## Ordering
//! Routes are kept sorted: longer prefixes first; at equal length, routes with
//! a matcher before wildcard routes; otherwise registration order. Dispatch
//! takes the first route whose prefix and matcher both accept the path.
//!
//! ## Locking
//! One `RwLock` guards routes, cache, middleware, and chains. Dispatch scans
//! under the read lock and takes the write lock only to fill the cache.
//!
//! ## Cache
//! Every distinct `method + path` that matched a route gets one entry, with no
//! size bound. A wildcard route therefore lets clients grow the cache by
//! enumerating paths. Entries are dropped only by `add_handler` and
//! `set_middleware`; put the router behind something that limits the path
//! space when it faces untrusted clients.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use http::uri::PathAndQuery;
use http::{Method, StatusCode};
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, trace};

use super::middleware::{Middleware, compose};
use super::response::error_response;
use super::route::{
    Handler, Request, Response, Route, RouteInfo, RouteParams, normalize_prefix,
};
use crate::error::Error;
use crate::identifier::is_identifier;

/// Outcome of [`Router::dispatch`].
pub enum Dispatch {
    Found(RouteMatch),
    /// No route accepts the path.
    NotFound,
    /// A route accepts the path but not the method.
    MethodNotAllowed,
}

/// Selected route.
pub struct RouteMatch {
    pub prefix: String,
    pub params: Vec<String>,
    /// Handler with the prefix's middleware applied.
    pub handler: Handler,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Found(m) => f
                .debug_struct("Found")
                .field("prefix", &m.prefix)
                .field("params", &m.params)
                .finish_non_exhaustive(),
            Dispatch::NotFound => f.write_str("NotFound"),
            Dispatch::MethodNotAllowed => f.write_str("MethodNotAllowed"),
        }
    }
}

struct Cached {
    index: usize,
    params: Vec<String>,
}

#[derive(Default)]
struct Inner {
    routes: Vec<Route>,
    /// `method + path` → selected route. One entry per distinct matched
    /// request line, unbounded; cleared only by `invalidate`.
    cache: HashMap<String, Cached>,
    middleware: HashMap<String, Middleware>,
    /// Normalized prefix → chain of middleware names.
    chains: HashMap<String, Vec<String>>,
    /// Bumped whenever cached indices or handlers go stale.
    generation: u64,
}

impl Inner {
    fn invalidate(&mut self) {
        self.cache.clear();
        self.generation += 1;
    }

    fn chain(&self, prefix: &str) -> Vec<Middleware> {
        self.chains
            .get(prefix)
            .into_iter()
            .flatten()
            .filter_map(|name| self.middleware.get(name).cloned())
            .collect()
    }

    fn find(&self, path: &str) -> Option<(usize, Vec<String>)> {
        self.routes
            .iter()
            .enumerate()
            .find_map(|(i, route)| route.matches(path).map(|params| (i, params)))
    }

    fn resolve(&self, index: usize, params: &[String], method: &Method) -> Dispatch {
        let Some(route) = self.routes.get(index) else {
            return Dispatch::NotFound;
        };
        if !route.methods.contains(method) {
            return Dispatch::MethodNotAllowed;
        }
        Dispatch::Found(RouteMatch {
            prefix: route.prefix.clone(),
            params: params.to_vec(),
            handler: route.effective.clone(),
        })
    }
}

/// HTTP router shared by the tasks that register handlers on it.
pub struct Router {
    label: String,
    inner: RwLock<Inner>,
}

impl Router {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Registers `handler` under `prefix` for `methods` (`GET` when empty).
    ///
    /// With no `matcher` the route accepts every path under the prefix. With
    /// one, the matcher is applied to the remainder of the path after the
    /// prefix, beginning with `/`, and its groups are exposed as [`RouteParams`].
    ///
    /// # Errors
    /// [`Error::BadParameter`] if `prefix` is not a valid URI path.
    pub fn add_handler(
        &self,
        prefix: &str,
        matcher: Option<Regex>,
        handler: Handler,
        methods: &[Method],
    ) -> Result<(), Error> {
        let prefix = normalize_prefix(prefix);
        match PathAndQuery::from_str(&prefix) {
            Ok(pq) if pq.query().is_none() => {}
            _ => return Err(Error::BadParameter(format!("invalid route prefix {prefix:?}"))),
        }
        let methods = if methods.is_empty() {
            vec![Method::GET]
        } else {
            methods.to_vec()
        };

        let mut inner = self.inner.write();
        let effective = compose(&inner.chain(&prefix), handler.clone());
        debug!(
            router = %self.label,
            prefix = %prefix,
            pattern = matcher.as_ref().map(Regex::as_str),
            methods = ?methods,
            "handler registered"
        );
        inner.routes.push(Route {
            prefix,
            matcher,
            methods,
            handler,
            effective,
        });
        inner
            .routes
            .sort_by_key(|r| (Reverse(r.prefix.len()), r.matcher.is_none()));
        inner.invalidate();
        Ok(())
    }

    /// Registers a middleware under a unique `name`.
    ///
    /// Middleware is not applied until a chain naming it is assigned with
    /// [`set_middleware`](Self::set_middleware).
    ///
    /// # Errors
    /// - [`Error::BadParameter`]: `name` does not match the identifier grammar
    /// - [`Error::DuplicateEntry`]: `name` already registered
    pub fn add_middleware(&self, name: &str, middleware: Middleware) -> Result<(), Error> {
        if !is_identifier(name) {
            return Err(Error::BadParameter(format!("invalid middleware name {name:?}")));
        }
        let mut inner = self.inner.write();
        if inner.middleware.contains_key(name) {
            return Err(Error::DuplicateEntry(format!("middleware {name:?}")));
        }
        inner.middleware.insert(name.to_owned(), middleware);
        debug!(router = %self.label, name, "middleware registered");
        Ok(())
    }

    /// Wraps every handler under `prefix` in the named middleware, first name
    /// outermost.
    ///
    /// Replaces any chain previously set for `prefix`, and applies to handlers
    /// registered under `prefix` later. An empty chain removes the wrapping.
    ///
    /// # Errors
    /// [`Error::NotFound`] if a name is not registered or no route uses `prefix`.
    pub fn set_middleware(&self, prefix: &str, chain: &[&str]) -> Result<(), Error> {
        let prefix = normalize_prefix(prefix);
        let mut inner = self.inner.write();

        let mut layers = Vec::with_capacity(chain.len());
        for name in chain {
            match inner.middleware.get(*name) {
                Some(mw) => layers.push(mw.clone()),
                None => return Err(Error::NotFound(format!("middleware {name:?}"))),
            }
        }
        if !inner.routes.iter().any(|r| r.prefix == prefix) {
            return Err(Error::NotFound(format!("route prefix {prefix:?}")));
        }

        for route in inner.routes.iter_mut().filter(|r| r.prefix == prefix) {
            route.effective = compose(&layers, route.handler.clone());
        }
        inner
            .chains
            .insert(prefix.clone(), chain.iter().map(|s| (*s).to_owned()).collect());
        inner.invalidate();
        debug!(router = %self.label, prefix = %prefix, chain = ?chain, "middleware chain set");
        Ok(())
    }

    /// Selects the route for `method` and `path`.
    ///
    /// Method mismatch on the first route that accepts the path is final;
    /// no other route is tried.
    pub fn dispatch(&self, method: &Method, path: &str) -> Dispatch {
        let key = format!("{method}{path}");
        let (index, params, generation, outcome) = {
            let inner = self.inner.read();
            if let Some(hit) = inner.cache.get(&key) {
                trace!(method = %method, path, "route cache hit");
                return inner.resolve(hit.index, &hit.params, method);
            }
            trace!(method = %method, path, "route cache miss");
            let Some((index, params)) = inner.find(path) else {
                return Dispatch::NotFound;
            };
            let outcome = inner.resolve(index, &params, method);
            (index, params, inner.generation, outcome)
        };

        let mut inner = self.inner.write();
        if inner.generation == generation {
            inner.cache.insert(key, Cached { index, params });
        }
        outcome
    }

    /// Dispatches `req` and runs the selected handler.
    ///
    /// Answers 404 or 405 with a JSON error body when no handler applies.
    pub async fn handle(&self, mut req: Request) -> Response {
        let method = req.method().clone();
        match self.dispatch(&method, req.uri().path()) {
            Dispatch::Found(m) => {
                req.extensions_mut().insert(RouteParams {
                    prefix: m.prefix,
                    params: m.params,
                });
                (m.handler)(req).await
            }
            Dispatch::NotFound => error_response(StatusCode::NOT_FOUND),
            Dispatch::MethodNotAllowed => error_response(StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    /// Registered routes in dispatch order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.inner.read().routes.iter().map(Route::info).collect()
    }
}

impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<router label={:?}", self.label)?;
        for route in self.routes() {
            write!(f, " {route}")?;
        }
        f.write_str(">")
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("label", &self.label)
            .field("routes", &self.routes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use parking_lot::Mutex;

    use super::*;
    use crate::router::{handler_fn, middleware_fn, text_response};

    fn literal(body: &'static str) -> Handler {
        handler_fn(move |_| async move { Response::new(Bytes::from_static(body.as_bytes())) })
    }

    fn request(method: Method, path: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    async fn call(router: &Router, method: Method, path: &str) -> (StatusCode, String) {
        let res = router.handle(request(method, path)).await;
        let body = String::from_utf8(res.body().to_vec()).unwrap();
        (res.status(), body)
    }

    fn table() -> Router {
        let router = Router::new("router");
        router.add_handler("/", None, literal("/"), &[]).unwrap();
        router.add_handler("/A", None, literal("/A"), &[]).unwrap();
        router.add_handler("/AA", None, literal("/AA"), &[]).unwrap();
        let re = |s: &str| Some(Regex::new(s).unwrap());
        router.add_handler("/", re("^/(test1)"), literal("/test1"), &[]).unwrap();
        router.add_handler("/AA", re("^/(test2)"), literal("/AA/test2"), &[]).unwrap();
        router.add_handler("/AA", re("^/(test3)"), literal("/AA/test3"), &[]).unwrap();
        router
    }

    /// Records each layer it passes through.
    fn recorder(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Middleware {
        middleware_fn(move |next: Handler| {
            let log = log.clone();
            handler_fn(move |req| {
                let next = next.clone();
                let log = log.clone();
                async move {
                    log.lock().push(name);
                    next(req).await
                }
            })
        })
    }

    fn deny() -> Middleware {
        middleware_fn(|_next: Handler| {
            handler_fn(|_| async { text_response(StatusCode::FORBIDDEN, "denied") })
        })
    }

    #[tokio::test]
    async fn test_longest_prefix_dispatch() {
        let router = table();
        let cases = [
            (Method::GET, "/", StatusCode::OK, "/"),
            (Method::GET, "/test", StatusCode::OK, "/"),
            (Method::POST, "/test", StatusCode::METHOD_NOT_ALLOWED, ""),
            (Method::GET, "/test1", StatusCode::OK, "/test1"),
            (Method::GET, "/A", StatusCode::OK, "/A"),
            (Method::GET, "/A/test1", StatusCode::OK, "/A"),
            (Method::GET, "/AB", StatusCode::OK, "/"),
            (Method::GET, "/AA", StatusCode::OK, "/AA"),
            (Method::GET, "/AA/test2", StatusCode::OK, "/AA/test2"),
            (Method::GET, "/AA/test3", StatusCode::OK, "/AA/test3"),
            (Method::GET, "/AA/other", StatusCode::OK, "/AA"),
            (Method::GET, "/AAA/test3", StatusCode::OK, "/"),
            (Method::GET, "/AAtest3", StatusCode::OK, "/"),
        ];
        for (method, path, code, body) in cases {
            let (status, got) = call(&router, method.clone(), path).await;
            assert_eq!(status, code, "{method} {path}");
            if !body.is_empty() {
                assert_eq!(got, body, "{method} {path}");
            }
        }
    }

    #[tokio::test]
    async fn test_not_found_and_method_not_allowed_bodies() {
        let router = Router::new("router");
        router.add_handler("/api", None, literal("api"), &[Method::POST]).unwrap();

        let (status, body) = call(&router, Method::GET, "/other").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "{\"code\":404,\"reason\":\"Not Found\"}\n");

        let (status, body) = call(&router, Method::GET, "/api/x").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "{\"code\":405,\"reason\":\"Method Not Allowed\"}\n");

        let (status, body) = call(&router, Method::POST, "/api/x").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "api");
    }

    #[test]
    fn test_method_mismatch_does_not_fall_through() {
        let router = Router::new("router");
        router.add_handler("/", None, literal("get"), &[]).unwrap();
        router
            .add_handler("/", Some(Regex::new("^/x").unwrap()), literal("put"), &[Method::PUT])
            .unwrap();
        assert!(matches!(router.dispatch(&Method::GET, "/x"), Dispatch::MethodNotAllowed));
        assert!(matches!(router.dispatch(&Method::PUT, "/x"), Dispatch::Found(_)));
        assert!(matches!(router.dispatch(&Method::GET, "/y"), Dispatch::Found(_)));
    }

    #[test]
    fn test_route_order() {
        let router = table();
        let order: Vec<(String, Option<String>)> = router
            .routes()
            .into_iter()
            .map(|r| (r.prefix, r.pattern))
            .collect();
        assert_eq!(
            order,
            vec![
                ("/AA/".to_owned(), Some("^/(test2)".to_owned())),
                ("/AA/".to_owned(), Some("^/(test3)".to_owned())),
                ("/AA/".to_owned(), None),
                ("/A/".to_owned(), None),
                ("/".to_owned(), Some("^/(test1)".to_owned())),
                ("/".to_owned(), None),
            ]
        );
    }

    #[test]
    fn test_invalid_prefix() {
        let router = Router::new("router");
        let err = router.add_handler("/a b", None, literal("x"), &[]).unwrap_err();
        assert!(matches!(err, Error::BadParameter(_)), "{err}");
        let err = router.add_handler("/a?b=1", None, literal("x"), &[]).unwrap_err();
        assert!(matches!(err, Error::BadParameter(_)), "{err}");
    }

    #[tokio::test]
    async fn test_route_params_extension() {
        let router = Router::new("router");
        let echo = handler_fn(|req: Request| async move {
            let params = req.extensions().get::<RouteParams>().cloned().unwrap_or_default();
            text_response(
                StatusCode::OK,
                &format!("{} {}", params.prefix, params.params.join(",")),
            )
        });
        router
            .add_handler("/users", Some(Regex::new(r"^/(\w+)(?:/(\d+))?$").unwrap()), echo, &[])
            .unwrap();

        let (_, body) = call(&router, Method::GET, "/users/alice/42").await;
        assert_eq!(body, "/users/ alice,42\n");
        let (_, body) = call(&router, Method::GET, "/users/bob").await;
        assert_eq!(body, "/users/ bob,\n");
    }

    #[test]
    fn test_cache_is_filled_and_invalidated() {
        let router = table();
        assert!(matches!(router.dispatch(&Method::GET, "/AA/test2"), Dispatch::Found(_)));
        assert!(matches!(router.dispatch(&Method::POST, "/AA/test2"), Dispatch::MethodNotAllowed));
        assert!(matches!(router.dispatch(&Method::GET, "/nothing/here"), Dispatch::Found(_)));
        assert_eq!(router.inner.read().cache.len(), 3);

        // Served from cache.
        match router.dispatch(&Method::GET, "/AA/test2") {
            Dispatch::Found(m) => {
                assert_eq!(m.prefix, "/AA/");
                assert_eq!(m.params, ["test2"]);
            }
            other => panic!("unexpected {other:?}"),
        }

        // A more specific route must win over the cached one.
        router.add_handler("/AA/test2", None, literal("deep"), &[]).unwrap();
        assert!(router.inner.read().cache.is_empty());
        match router.dispatch(&Method::GET, "/AA/test2") {
            Dispatch::Found(m) => {
                assert_eq!(m.prefix, "/AA/test2/");
                assert!(m.params.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cache_holds_every_distinct_path_until_reconfigured() {
        let router = Router::new("router");
        router.add_handler("/", None, literal("root"), &[]).unwrap();
        for i in 0..500 {
            let path = format!("/files/{i}");
            assert!(matches!(router.dispatch(&Method::GET, &path), Dispatch::Found(_)));
        }
        assert_eq!(router.inner.read().cache.len(), 500);

        let log = Arc::new(Mutex::new(Vec::new()));
        router.add_middleware("audit", recorder("audit", log)).unwrap();
        assert_eq!(router.inner.read().cache.len(), 500);
        router.set_middleware("/", &["audit"]).unwrap();
        assert!(router.inner.read().cache.is_empty());
    }

    #[test]
    fn test_unmatched_paths_are_not_cached() {
        let router = Router::new("router");
        router.add_handler("/api", None, literal("api"), &[]).unwrap();
        assert!(matches!(router.dispatch(&Method::GET, "/web"), Dispatch::NotFound));
        assert!(router.inner.read().cache.is_empty());
    }

    #[test]
    fn test_add_middleware_rules() {
        let router = Router::new("router");
        let log = Arc::new(Mutex::new(Vec::new()));
        router.add_middleware("log", recorder("log", log.clone())).unwrap();

        let err = router.add_middleware("log", recorder("log", log.clone())).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry(_)), "{err}");
        let err = router.add_middleware("0log", recorder("log", log)).unwrap_err();
        assert!(matches!(err, Error::BadParameter(_)), "{err}");
    }

    #[test]
    fn test_set_middleware_not_found() {
        let router = Router::new("router");
        router.add_handler("/api", None, literal("api"), &[]).unwrap();
        router.add_middleware("deny", deny()).unwrap();

        let err = router.set_middleware("/api", &["deny", "missing"]).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "{err}");
        let err = router.set_middleware("/web", &["deny"]).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "{err}");
    }

    #[tokio::test]
    async fn test_middleware_is_explicit_and_ordered() {
        let router = Router::new("router");
        let log = Arc::new(Mutex::new(Vec::new()));
        router.add_middleware("alpha", recorder("alpha", log.clone())).unwrap();
        router.add_middleware("beta", recorder("beta", log.clone())).unwrap();
        router.add_handler("/api", None, literal("api"), &[]).unwrap();
        router.add_handler("/web", None, literal("web"), &[]).unwrap();

        // Registered but not assigned: nothing runs.
        call(&router, Method::GET, "/api/x").await;
        assert!(log.lock().is_empty());

        router.set_middleware("api", &["alpha", "beta"]).unwrap();
        let (status, body) = call(&router, Method::GET, "/api/x").await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "api"));
        assert_eq!(*log.lock(), ["alpha", "beta"]);

        // Other prefixes are untouched.
        log.lock().clear();
        call(&router, Method::GET, "/web/x").await;
        assert!(log.lock().is_empty());

        // Later handlers under the prefix inherit the chain.
        router
            .add_handler("/api", Some(Regex::new("^/v2").unwrap()), literal("v2"), &[])
            .unwrap();
        let (_, body) = call(&router, Method::GET, "/api/v2").await;
        assert_eq!(body, "v2");
        assert_eq!(*log.lock(), ["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_middleware_short_circuit_and_replace() {
        let router = Router::new("router");
        let log = Arc::new(Mutex::new(Vec::new()));
        router.add_middleware("deny", deny()).unwrap();
        router.add_middleware("alpha", recorder("alpha", log.clone())).unwrap();
        router.add_handler("/admin", None, literal("admin"), &[]).unwrap();

        router.set_middleware("/admin/", &["deny", "alpha"]).unwrap();
        let (status, body) = call(&router, Method::GET, "/admin").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "denied\n");
        assert!(log.lock().is_empty());

        // Replacing the chain drops the previous one.
        router.set_middleware("/admin", &["alpha"]).unwrap();
        let (status, _) = call(&router, Method::GET, "/admin").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(*log.lock(), ["alpha"]);

        router.set_middleware("/admin", &[]).unwrap();
        log.lock().clear();
        let (status, body) = call(&router, Method::GET, "/admin").await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "admin"));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_display() {
        let router = Router::new("main");
        router.add_handler("/api", None, literal("api"), &[Method::GET, Method::POST]).unwrap();
        assert_eq!(
            router.to_string(),
            r#"<router label="main" "/api/" "" => ["GET", "POST"]>"#
        );
    }

    #[tokio::test]
    async fn test_concurrent_dispatch() {
        let router = Arc::new(table());
        let mut set = tokio::task::JoinSet::new();
        for i in 0..16 {
            let router = router.clone();
            set.spawn(async move {
                let path = if i % 2 == 0 { "/AA/test2" } else { "/AB" };
                call(&router, Method::GET, path).await
            });
        }
        while let Some(res) = set.join_next().await {
            let (status, body) = res.unwrap();
            assert_eq!(status, StatusCode::OK);
            assert!(body == "/AA/test2" || body == "/", "{body}");
        }
    }
}
