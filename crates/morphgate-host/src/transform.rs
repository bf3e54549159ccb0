//! The transform seam: the black-box step installed middleware delegates to.

use async_trait::async_trait;

use morphgate_core::error::Result;

use crate::host::HostHandle;
use crate::middleware::{Next, RequestCtx};

/// A request/response transformation step.
///
/// Installed middleware forwards `(host, ctx, next)` here. What an
/// implementation does with the payload is its own business; the registration
/// pass treats it as opaque.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, host: &HostHandle, ctx: RequestCtx, next: Next) -> Result<RequestCtx>;
}

/// Default transformer: traces the visit and forwards unchanged.
#[derive(Debug, Default)]
pub struct PassthroughTransform;

#[async_trait]
impl Transform for PassthroughTransform {
    async fn apply(&self, _host: &HostHandle, ctx: RequestCtx, next: Next) -> Result<RequestCtx> {
        tracing::trace!(method = %ctx.method, path = %ctx.path, "transform passthrough");
        next(ctx).await
    }
}
