use std::sync::Arc;

use waypoint_endpoint::SharedEndpoint;

use crate::error::Result;

/// Picks one endpoint per call from a live snapshot.
///
/// Implementations read the snapshot afresh on every pick, so a set that
/// grows or shrinks between calls is always indexed within bounds.
pub trait Balancer<Req, Resp>: Send + Sync {
	/// Fails with [`Error::NoEndpointsAvailable`](crate::Error::NoEndpointsAvailable)
	/// when the snapshot is empty.
	fn pick(&self) -> Result<SharedEndpoint<Req, Resp>>;
}

impl<Req, Resp, B> Balancer<Req, Resp> for Arc<B>
where
	B: Balancer<Req, Resp> + ?Sized,
{
	fn pick(&self) -> Result<SharedEndpoint<Req, Resp>> {
		(**self).pick()
	}
}

impl<Req, Resp, B> Balancer<Req, Resp> for Box<B>
where
	B: Balancer<Req, Resp> + ?Sized,
{
	fn pick(&self) -> Result<SharedEndpoint<Req, Resp>> {
		(**self).pick()
	}
}
