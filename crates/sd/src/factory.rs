use std::future::Future;

use async_trait::async_trait;
use waypoint_endpoint::{BoxError, SharedEndpoint};

/// A releasable resource owned alongside an endpoint, e.g. a connection.
///
/// `close` consumes the handle, so a handle can only ever be released once.
pub trait Closer: Send + Sync {
	fn close(self: Box<Self>) -> Result<(), BoxError>;
}

impl<F> Closer for F
where
	F: FnOnce() -> Result<(), BoxError> + Send + Sync,
{
	fn close(self: Box<Self>) -> Result<(), BoxError> {
		(*self)()
	}
}

/// What a [`Factory`] returns for one instance.
pub struct Materialized<Req, Resp> {
	pub endpoint: SharedEndpoint<Req, Resp>,
	pub handle: Option<Box<dyn Closer>>,
}

impl<Req, Resp> Materialized<Req, Resp> {
	/// An endpoint with no resource to release.
	pub fn new(endpoint: SharedEndpoint<Req, Resp>) -> Self {
		Self { endpoint, handle: None }
	}

	#[must_use]
	pub fn with_handle(mut self, handle: impl Closer + 'static) -> Self {
		self.handle = Some(Box::new(handle));
		self
	}
}

/// Converts an instance address into a callable endpoint.
///
/// May be slow (connection setup) and may fail per instance.
#[async_trait]
pub trait Factory<Req, Resp>: Send + Sync {
	async fn make(&self, instance: &str) -> Result<Materialized<Req, Resp>, BoxError>;
}

/// Factory backed by an async closure. See [`factory_fn`].
#[derive(Clone)]
pub struct FnFactory<F> {
	f: F,
}

/// Builds a factory from `Fn(String) -> impl Future<Output = Result<Materialized, BoxError>>`.
pub fn factory_fn<F>(f: F) -> FnFactory<F> {
	FnFactory { f }
}

#[async_trait]
impl<F, Fut, Req, Resp> Factory<Req, Resp> for FnFactory<F>
where
	F: Fn(String) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Materialized<Req, Resp>, BoxError>> + Send + 'static,
	Req: 'static,
	Resp: 'static,
{
	async fn make(&self, instance: &str) -> Result<Materialized<Req, Resp>, BoxError> {
		(self.f)(instance.to_owned()).await
	}
}
