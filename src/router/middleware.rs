//! Named request-wrapping functions.
//!
//! A [`Middleware`] takes the next handler and returns a handler that runs
//! around it. Chains are composed so that the first name is the outermost
//! layer:
//!
//! ```text
//! set_middleware("/api", ["auth", "log"])
//!
//! request ─► auth ─► log ─► handler
//!              │
//!              └─► may answer without calling the rest
//! ```

use std::sync::Arc;

use super::route::Handler;

/// Request-wrapping function registered on the router by name.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Wraps a closure into a [`Middleware`].
///
/// # Example
/// ```rust
/// use taskhost::router::{Handler, handler_fn, middleware_fn};
///
/// let passthrough = middleware_fn(|next: Handler| {
///     handler_fn(move |req| {
///         let next = next.clone();
///         async move { next(req).await }
///     })
/// });
/// ```
pub fn middleware_fn<F>(f: F) -> Middleware
where
    F: Fn(Handler) -> Handler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps `handler` so that `chain[0]` runs first.
pub(crate) fn compose(chain: &[Middleware], handler: Handler) -> Handler {
    chain.iter().rev().fold(handler, |inner, mw| mw(inner))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::HeaderValue;

    use super::*;
    use crate::router::route::{Request, Response, handler_fn};

    fn tag(name: &'static str) -> Middleware {
        middleware_fn(move |next: Handler| {
            handler_fn(move |req| {
                let next = next.clone();
                async move {
                    let mut res = next(req).await;
                    res.headers_mut()
                        .append("x-layer", HeaderValue::from_static(name));
                    res
                }
            })
        })
    }

    #[tokio::test]
    async fn test_first_is_outermost() {
        let handler = handler_fn(|_| async { Response::new(Bytes::from_static(b"ok")) });
        let wrapped = compose(&[tag("outer"), tag("inner")], handler);
        let res = wrapped(Request::default()).await;

        // Inner layers touch the response first on the way out.
        let layers: Vec<_> = res
            .headers()
            .get_all("x-layer")
            .iter()
            .map(|v| v.to_str().unwrap().to_owned())
            .collect();
        assert_eq!(layers, ["inner", "outer"]);
    }

    #[tokio::test]
    async fn test_empty_chain_is_identity() {
        let handler = handler_fn(|_| async { Response::new(Bytes::from_static(b"ok")) });
        let res = compose(&[], handler)(Request::default()).await;
        assert_eq!(res.body().as_ref(), b"ok");
    }
}
