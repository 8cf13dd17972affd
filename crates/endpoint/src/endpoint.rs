use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Context;

/// Type-erased error returned by endpoints.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single remote-procedure call unit.
///
/// Used uniformly for serving and for invoking: the value a factory produces
/// for one instance, the value a balancer picks, and the value the retry
/// dispatcher exposes to callers all implement this trait.
#[async_trait]
pub trait Endpoint<Req, Resp>: Send + Sync {
	async fn call(&self, cx: &Context, req: Req) -> Result<Resp, BoxError>;
}

/// Shared, dynamically dispatched endpoint.
pub type SharedEndpoint<Req, Resp> = Arc<dyn Endpoint<Req, Resp>>;

#[async_trait]
impl<Req, Resp, E> Endpoint<Req, Resp> for Arc<E>
where
	Req: Send + 'static,
	Resp: Send + 'static,
	E: Endpoint<Req, Resp> + ?Sized,
{
	async fn call(&self, cx: &Context, req: Req) -> Result<Resp, BoxError> {
		(**self).call(cx, req).await
	}
}

/// Endpoint backed by an async closure. See [`endpoint_fn`].
#[derive(Clone)]
pub struct FnEndpoint<F> {
	f: F,
}

/// Builds an endpoint from `Fn(Context, Req) -> impl Future<Output = Result<Resp, BoxError>>`.
pub fn endpoint_fn<F>(f: F) -> FnEndpoint<F> {
	FnEndpoint { f }
}

#[async_trait]
impl<F, Fut, Req, Resp> Endpoint<Req, Resp> for FnEndpoint<F>
where
	F: Fn(Context, Req) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Resp, BoxError>> + Send + 'static,
	Req: Send + 'static,
	Resp: Send + 'static,
{
	async fn call(&self, cx: &Context, req: Req) -> Result<Resp, BoxError> {
		(self.f)(cx.clone(), req).await
	}
}

impl<F> std::fmt::Debug for FnEndpoint<F> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FnEndpoint").finish_non_exhaustive()
	}
}
