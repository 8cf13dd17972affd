use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use waypoint_worker::{BackgroundTask, GenerationClock, TaskClass};

use super::Registrar;

/// Keeps a registration alive by re-announcing it on a fixed interval.
///
/// `Stopped --register--> Running` spawns one renewal loop that calls the
/// inner registrar immediately and then once per interval. `register` while
/// running does nothing. `Running --deregister--> Stopped` stops the loop,
/// waits for it to exit, then deregisters once. `deregister` while stopped
/// does nothing. Transitions are serialized.
pub struct PeriodicRegistrar<R> {
	inner: Arc<R>,
	interval: Duration,
	generations: GenerationClock,
	running: Mutex<Option<BackgroundTask>>,
}

impl<R> PeriodicRegistrar<R>
where
	R: Registrar + 'static,
{
	/// # Panics
	///
	/// Panics if `interval` is zero.
	pub fn new(inner: R, interval: Duration) -> Self {
		assert!(!interval.is_zero(), "renewal interval must be > 0");
		Self {
			inner: Arc::new(inner),
			interval,
			generations: GenerationClock::new(),
			running: Mutex::new(None),
		}
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	pub fn inner(&self) -> &R {
		&self.inner
	}

	/// Generation of the most recently started renewal loop, 0 if none.
	pub fn generation(&self) -> u64 {
		self.generations.current()
	}

	pub async fn is_running(&self) -> bool {
		self.running.lock().await.is_some()
	}

	async fn start(&self) {
		let mut running = self.running.lock().await;
		if running.is_some() {
			tracing::debug!("registrar.already_running");
			return;
		}
		let generation = self.generations.next();
		let inner = Arc::clone(&self.inner);
		let interval = self.interval;
		*running = Some(BackgroundTask::spawn("periodic-registrar", TaskClass::Renewal, generation, move |stop| {
			renew(inner, interval, stop)
		}));
		tracing::debug!(generation, interval_ms = interval.as_millis() as u64, "registrar.started");
	}

	async fn stop(&self) {
		let mut running = self.running.lock().await;
		let Some(task) = running.take() else {
			tracing::debug!("registrar.already_stopped");
			return;
		};
		task.stop().await;
		tracing::debug!(generation = task.generation(), "registrar.stopped");
		self.inner.deregister().await;
	}
}

async fn renew<R: Registrar>(inner: Arc<R>, interval: Duration, stop: CancellationToken) {
	let mut ticker = tokio::time::interval(interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	loop {
		tokio::select! {
			biased;
			_ = stop.cancelled() => return,
			_ = ticker.tick() => inner.register().await,
		}
	}
}

#[async_trait]
impl<R> Registrar for PeriodicRegistrar<R>
where
	R: Registrar + 'static,
{
	async fn register(&self) {
		self.start().await;
	}

	async fn deregister(&self) {
		self.stop().await;
	}
}

impl<R> std::fmt::Debug for PeriodicRegistrar<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PeriodicRegistrar")
			.field("interval", &self.interval)
			.field("generation", &self.generations.current())
			.finish_non_exhaustive()
	}
}
