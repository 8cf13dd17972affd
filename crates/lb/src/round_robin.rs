use std::sync::atomic::{AtomicUsize, Ordering};

use waypoint_endpoint::{EndpointSource, SharedEndpoint};

use crate::balancer::Balancer;
use crate::error::{Error, Result};

/// Rotates through the snapshot with a shared counter.
///
/// The counter is taken modulo the length seen at pick time, so rotation is
/// even while the set is stable and may skip or repeat once across a resize.
pub struct RoundRobin<S> {
	source: S,
	counter: AtomicUsize,
}

impl<S> RoundRobin<S> {
	pub fn new(source: S) -> Self {
		Self {
			source,
			counter: AtomicUsize::new(0),
		}
	}

	pub fn source(&self) -> &S {
		&self.source
	}
}

impl<Req, Resp, S> Balancer<Req, Resp> for RoundRobin<S>
where
	S: EndpointSource<Req, Resp>,
{
	fn pick(&self) -> Result<SharedEndpoint<Req, Resp>> {
		let snapshot = self.source.endpoints();
		if snapshot.is_empty() {
			return Err(Error::NoEndpointsAvailable);
		}
		let n = self.counter.fetch_add(1, Ordering::Relaxed);
		snapshot.get(n % snapshot.len()).cloned().ok_or(Error::NoEndpointsAvailable)
	}
}

impl<S> std::fmt::Debug for RoundRobin<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RoundRobin")
			.field("counter", &self.counter.load(Ordering::Relaxed))
			.finish_non_exhaustive()
	}
}
