use waypoint_endpoint::{EndpointSource, Snapshot};

use crate::cache::Cache;
use crate::factory::Factory;

/// Endpoints for a fixed instance list, materialized once.
///
/// Instances the factory rejects are skipped.
pub struct StaticSubscriber<Req, Resp> {
	cache: Cache<Req, Resp>,
}

impl<Req, Resp> StaticSubscriber<Req, Resp>
where
	Req: 'static,
	Resp: 'static,
{
	pub async fn new<I, S>(instances: I, factory: impl Factory<Req, Resp> + 'static) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let cache = Cache::new(factory);
		cache.update(instances).await;
		Self { cache }
	}

	pub fn endpoints(&self) -> Snapshot<Req, Resp> {
		self.cache.endpoints()
	}

	/// Releases every handle. Later calls to `endpoints` return an empty set.
	pub async fn close(&self) {
		self.cache.close().await;
	}
}

impl<Req: 'static, Resp: 'static> EndpointSource<Req, Resp> for StaticSubscriber<Req, Resp> {
	fn endpoints(&self) -> Snapshot<Req, Resp> {
		self.cache.endpoints()
	}
}

impl<Req, Resp> std::fmt::Debug for StaticSubscriber<Req, Resp> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StaticSubscriber").field("cache", &self.cache).finish()
	}
}
