//! Bridges a discovery backend's instance stream into a [`Cache`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use waypoint_endpoint::{EndpointSource, Snapshot};
use waypoint_worker::{BackgroundTask, TaskClass};

use crate::cache::Cache;
use crate::client::DiscoveryClient;
use crate::factory::Factory;

mod fixed;

pub use fixed::StaticSubscriber;

/// Instance lists buffered between the backend's watch and the cache.
const UPDATE_BUFFER: usize = 16;

/// How long a stopping subscriber waits for the watch to honor its token
/// before aborting it.
const WATCH_GRACE: Duration = Duration::from_millis(500);

/// Keeps a [`Cache`] in step with one service's instances in a registry.
///
/// The background loop starts on construction, applies an empty update
/// first, then applies every list the client's watch pushes. Stopping it
/// closes the cache, releasing every handle.
pub struct Subscriber<Req, Resp> {
	name: Arc<str>,
	cache: Arc<Cache<Req, Resp>>,
	task: BackgroundTask,
}

impl<Req, Resp> Subscriber<Req, Resp>
where
	Req: 'static,
	Resp: 'static,
{
	pub fn new(name: impl Into<Arc<str>>, client: Arc<dyn DiscoveryClient>, factory: impl Factory<Req, Resp> + 'static) -> Self {
		Self::with_cache(name, client, Cache::new(factory))
	}

	/// Runs the loop against a prepared cache (e.g. one with an observer).
	pub fn with_cache(name: impl Into<Arc<str>>, client: Arc<dyn DiscoveryClient>, cache: Cache<Req, Resp>) -> Self {
		let name = name.into();
		let cache = Arc::new(cache);
		let task = {
			let name = Arc::clone(&name);
			let cache = Arc::clone(&cache);
			BackgroundTask::spawn(format!("subscriber:{name}"), TaskClass::Subscription, 1, move |stop| {
				follow(name, client, cache, stop)
			})
		};
		Self { name, cache, task }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Current endpoints. Never fails; empty before the first update lands.
	pub fn endpoints(&self) -> Snapshot<Req, Resp> {
		self.cache.endpoints()
	}

	pub fn cache(&self) -> &Arc<Cache<Req, Resp>> {
		&self.cache
	}

	/// Stops the loop and waits until it has exited. Idempotent.
	pub async fn stop(&self) {
		self.task.stop().await;
	}

	/// True once the background loop has exited.
	pub fn is_stopped(&self) -> bool {
		self.task.is_finished()
	}
}

async fn follow<Req, Resp>(name: Arc<str>, client: Arc<dyn DiscoveryClient>, cache: Arc<Cache<Req, Resp>>, stop: CancellationToken)
where
	Req: 'static,
	Resp: 'static,
{
	cache.update(std::iter::empty::<&str>()).await;

	let (tx, mut rx) = mpsc::channel::<Vec<String>>(UPDATE_BUFFER);
	let watcher = {
		let name = Arc::clone(&name);
		let stop = stop.child_token();
		waypoint_worker::spawn(TaskClass::Subscription, async move { client.watch_entries(&name, tx, stop).await })
	};
	tracing::debug!(service = %name, "subscriber.started");

	let mut watching = true;
	loop {
		tokio::select! {
			biased;
			_ = stop.cancelled() => break,
			update = rx.recv(), if watching => match update {
				Some(instances) => {
					tracing::debug!(service = %name, instances = instances.len(), "subscriber.update");
					cache.update(instances).await;
				}
				None => {
					// Keep serving the last known instances until stopped.
					tracing::warn!(service = %name, "subscriber.watch_ended");
					watching = false;
				}
			},
		}
	}

	drop(rx);
	let abort = watcher.abort_handle();
	match tokio::time::timeout(WATCH_GRACE, watcher).await {
		Ok(Ok(())) => {}
		Ok(Err(err)) if err.is_cancelled() => {}
		Ok(Err(err)) => tracing::warn!(service = %name, error = %err, "subscriber.watch_join_failed"),
		Err(_) => {
			tracing::warn!(service = %name, grace_ms = WATCH_GRACE.as_millis() as u64, "subscriber.watch_aborted");
			abort.abort();
		}
	}
	cache.close().await;
	tracing::debug!(service = %name, "subscriber.stopped");
}

impl<Req: 'static, Resp: 'static> EndpointSource<Req, Resp> for Subscriber<Req, Resp> {
	fn endpoints(&self) -> Snapshot<Req, Resp> {
		self.cache.endpoints()
	}
}

impl<Req, Resp> std::fmt::Debug for Subscriber<Req, Resp> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscriber")
			.field("name", &self.name)
			.field("cache", &self.cache)
			.field("task", &self.task)
			.finish()
	}
}

#[cfg(test)]
mod tests;
