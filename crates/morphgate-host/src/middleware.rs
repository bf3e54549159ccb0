//! Middleware machinery: request context, continuations, and the transform
//! attachment helper.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use morphgate_core::error::Result;

use crate::host::HostHandle;
use crate::registry::Route;

/// Request-scoped context threaded through a middleware chain.
#[derive(Debug, Clone, Default)]
pub struct RequestCtx {
    pub method: String,
    pub path: String,
    pub request: Option<serde_json::Value>,
    pub response: Option<serde_json::Value>,
}

impl RequestCtx {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            request: None,
            response: None,
        }
    }
}

/// Continuation invoking the rest of a chain.
pub type Next = Box<dyn FnOnce(RequestCtx) -> BoxFuture<'static, Result<RequestCtx>> + Send>;

/// A route middleware handler.
pub type Middleware =
    Arc<dyn Fn(RequestCtx, Next) -> BoxFuture<'static, Result<RequestCtx>> + Send + Sync>;

/// Terminal continuation resolving the context unchanged.
pub fn noop_next() -> Next {
    Box::new(|ctx| async move { Ok(ctx) }.boxed())
}

/// Ordered middleware sequence on one route.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    handlers: Vec<Middleware>,
}

impl MiddlewareChain {
    pub fn push(&mut self, mw: Middleware) {
        self.handlers.push(mw);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Fold the chain into a single continuation ending at `terminal`, then
    /// run it. This is the harness used by tests and the demo binary; a
    /// production host framework drives chains its own way.
    pub fn dispatch(&self, ctx: RequestCtx, terminal: Next) -> BoxFuture<'static, Result<RequestCtx>> {
        let mut next = terminal;
        for mw in self.handlers.iter().rev() {
            let mw = Arc::clone(mw);
            let prev = next;
            next = Box::new(move |ctx| mw(ctx, prev));
        }
        next(ctx)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Build the transform middleware. The host handle is captured by value, so
/// the generated closure reads no ambient globals.
pub fn transform_middleware(handle: HostHandle) -> Middleware {
    Arc::new(move |ctx, next| {
        let handle = handle.clone();
        async move {
            let transformer = handle.transformer();
            transformer.apply(&handle, ctx, next).await
        }
        .boxed()
    })
}

/// Install the transform middleware on `route` unless already present.
/// Returns whether this call instrumented the route.
pub fn attach_transform(route: &mut Route, handle: &HostHandle) -> bool {
    if route.config.transform_installed {
        return false;
    }
    route.config.middlewares.push(transform_middleware(handle.clone()));
    route.config.transform_installed = true;
    true
}
