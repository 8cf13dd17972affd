//! Discovery backend interface.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use waypoint_endpoint::BoxError;

use crate::Service;

/// A service registry as seen by this crate.
///
/// The wire protocol behind it (DNS, an HTTP registry, ...) is the
/// implementor's business.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
	/// Current instance addresses for `name`.
	async fn entries(&self, name: &str) -> Result<Vec<String>, BoxError>;

	/// Pushes instance lists for `name` into `updates` until `stop` fires or
	/// the receiver goes away.
	async fn watch_entries(&self, name: &str, updates: mpsc::Sender<Vec<String>>, stop: CancellationToken);

	/// Announces `service`, or renews its lease if already known.
	async fn register(&self, service: &Service) -> Result<(), BoxError>;

	/// Withdraws `service`.
	async fn deregister(&self, service: &Service) -> Result<(), BoxError>;
}

/// Watch implementation for backends that can only be polled.
///
/// Calls [`DiscoveryClient::entries`] every `interval` and forwards the
/// result. A failed poll forwards an empty list, so callers stop routing to
/// instances the registry can no longer vouch for.
pub async fn poll_entries<C>(client: &C, name: &str, interval: Duration, updates: mpsc::Sender<Vec<String>>, stop: CancellationToken)
where
	C: DiscoveryClient + ?Sized,
{
	let mut ticker = tokio::time::interval(interval);
	ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
	loop {
		tokio::select! {
			biased;
			_ = stop.cancelled() => return,
			_ = ticker.tick() => {}
		}

		let polled = tokio::select! {
			biased;
			_ = stop.cancelled() => return,
			polled = client.entries(name) => polled,
		};
		let list = match polled {
			Ok(list) => list,
			Err(err) => {
				tracing::warn!(service = name, error = %err, "discovery.poll_failed");
				Vec::new()
			}
		};

		tokio::select! {
			biased;
			_ = stop.cancelled() => return,
			sent = updates.send(list) => {
				if sent.is_err() {
					return;
				}
			}
		}
	}
}
