//! Handler types and the route table entry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use http::Method;
use regex::Regex;

/// Request seen by handlers. The body is fully buffered.
pub type Request = http::Request<Bytes>;

/// Response produced by handlers.
pub type Response = http::Response<Bytes>;

/// Shared asynchronous request handler.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wraps an async function or closure into a [`Handler`].
///
/// # Example
/// ```rust
/// use http::StatusCode;
/// use taskhost::router::{handler_fn, text_response};
///
/// let hello = handler_fn(|_req| async { text_response(StatusCode::OK, "hello") });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req| f(req).boxed())
}

/// Route prefix and regex captures of the route that matched a request.
///
/// Inserted into the request extensions before the handler is called.
/// Unmatched optional groups are empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteParams {
    /// Normalized prefix (begins and ends with `/`).
    pub prefix: String,
    /// Captured groups, in group order; empty for wildcard routes.
    pub params: Vec<String>,
}

/// Diagnostic view of a registered route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteInfo {
    pub prefix: String,
    pub pattern: Option<String>,
    pub methods: Vec<Method>,
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        write!(
            f,
            "{:?} {:?} => {:?}",
            self.prefix,
            self.pattern.as_deref().unwrap_or(""),
            methods
        )
    }
}

pub(crate) struct Route {
    pub prefix: String,
    pub matcher: Option<Regex>,
    pub methods: Vec<Method>,
    /// Handler as registered.
    pub handler: Handler,
    /// Handler wrapped in the prefix's middleware chain.
    pub effective: Handler,
}

impl Route {
    /// Returns the captures if `path` selects this route.
    pub fn matches(&self, path: &str) -> Option<Vec<String>> {
        let rest = strip_prefix(path, &self.prefix)?;
        let Some(re) = &self.matcher else {
            return Some(Vec::new());
        };
        let caps = re.captures(&rest)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_owned()))
                .collect(),
        )
    }

    pub fn info(&self) -> RouteInfo {
        RouteInfo {
            prefix: self.prefix.clone(),
            pattern: self.matcher.as_ref().map(|re| re.as_str().to_owned()),
            methods: self.methods.clone(),
        }
    }
}

/// Adds a leading and a trailing `/`.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 2);
    if !prefix.starts_with('/') {
        out.push('/');
    }
    out.push_str(prefix);
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}

/// Remainder of `path` under `prefix`, beginning with `/`.
///
/// `prefix` must be normalized. The path without its trailing `/` also
/// matches, so `/AA` falls under `/AA/`, while `/AAA` does not.
pub(crate) fn strip_prefix(path: &str, prefix: &str) -> Option<String> {
    if let Some(rest) = path.strip_prefix(prefix) {
        Some(format!("/{rest}"))
    } else if path.len() + 1 == prefix.len() && prefix.starts_with(path) {
        Some("/".to_owned())
    } else {
        None
    }
}
