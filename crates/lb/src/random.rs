use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use waypoint_endpoint::{EndpointSource, SharedEndpoint};

use crate::balancer::Balancer;
use crate::error::{Error, Result};

/// Picks a uniformly random endpoint from the current snapshot.
pub struct Random<S> {
	source: S,
	rng: Mutex<StdRng>,
}

impl<S> Random<S> {
	/// Seeds from the operating system.
	pub fn new(source: S) -> Self {
		Self::from_rng(source, StdRng::from_os_rng())
	}

	/// Reproducible selection sequence for a given seed.
	pub fn with_seed(source: S, seed: u64) -> Self {
		Self::from_rng(source, StdRng::seed_from_u64(seed))
	}

	fn from_rng(source: S, rng: StdRng) -> Self {
		Self { source, rng: Mutex::new(rng) }
	}

	pub fn source(&self) -> &S {
		&self.source
	}
}

impl<Req, Resp, S> Balancer<Req, Resp> for Random<S>
where
	S: EndpointSource<Req, Resp>,
{
	fn pick(&self) -> Result<SharedEndpoint<Req, Resp>> {
		let snapshot = self.source.endpoints();
		if snapshot.is_empty() {
			return Err(Error::NoEndpointsAvailable);
		}
		let index = self.rng.lock().random_range(0..snapshot.len());
		snapshot.get(index).cloned().ok_or(Error::NoEndpointsAvailable)
	}
}

impl<S> std::fmt::Debug for Random<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Random").finish_non_exhaustive()
	}
}
