//! Adapters between [`Endpoint`] and [`tower_service::Service`].
//!
//! Circuit breakers, rate limiters and similar per-instance middleware are
//! usually written against tower. [`ServiceEndpoint`] lets a factory wrap one
//! instance's client in such a stack and hand it to the cache as an endpoint;
//! [`EndpointService`] goes the other way for callers that expect a tower
//! service.

use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use async_trait::async_trait;
use tower_service::Service;

use crate::{BoxError, Context, Endpoint, SharedEndpoint};

/// Exposes a tower service as an [`Endpoint`].
///
/// The service is cloned per call, as tower recommends for shared use. The
/// call is abandoned if the context finishes first.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint<S> {
	inner: S,
}

impl<S> ServiceEndpoint<S> {
	pub fn new(inner: S) -> Self {
		Self { inner }
	}

	pub fn into_inner(self) -> S {
		self.inner
	}
}

#[async_trait]
impl<S, Req, Resp> Endpoint<Req, Resp> for ServiceEndpoint<S>
where
	S: Service<Req, Response = Resp> + Clone + Send + Sync + 'static,
	S::Error: Into<BoxError>,
	S::Future: Send,
	Req: Send + 'static,
	Resp: Send + 'static,
{
	async fn call(&self, cx: &Context, req: Req) -> Result<Resp, BoxError> {
		let mut svc = self.inner.clone();
		let fut = async move {
			poll_fn(|task_cx| svc.poll_ready(task_cx)).await.map_err(Into::into)?;
			svc.call(req).await.map_err(Into::into)
		};
		cx.run(fut).await?
	}
}

/// Exposes an [`Endpoint`] as a tower service bound to one [`Context`].
pub struct EndpointService<Req, Resp> {
	endpoint: SharedEndpoint<Req, Resp>,
	cx: Context,
}

impl<Req, Resp> EndpointService<Req, Resp> {
	pub fn new(endpoint: SharedEndpoint<Req, Resp>, cx: Context) -> Self {
		Self { endpoint, cx }
	}
}

impl<Req, Resp> Clone for EndpointService<Req, Resp> {
	fn clone(&self) -> Self {
		Self {
			endpoint: self.endpoint.clone(),
			cx: self.cx.clone(),
		}
	}
}

impl<Req, Resp> Service<Req> for EndpointService<Req, Resp>
where
	Req: Send + 'static,
	Resp: Send + 'static,
{
	type Response = Resp;
	type Error = BoxError;
	type Future = Pin<Box<dyn Future<Output = Result<Resp, BoxError>> + Send>>;

	fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
		Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: Req) -> Self::Future {
		let endpoint = self.endpoint.clone();
		let cx = self.cx.clone();
		Box::pin(async move { endpoint.call(&cx, req).await })
	}
}
