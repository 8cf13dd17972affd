use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::exit::{ExitSignal, exit_pair};
use crate::{TaskClass, spawn};

/// A cancellable background loop with an idempotent, multi-caller stop.
///
/// The loop body receives a [`CancellationToken`] and is expected to return
/// once the token fires. [`BackgroundTask::stop`] cancels the token and waits
/// for the body to actually return, so no detached loop outlives a completed
/// stop. Dropping the handle cancels the token without waiting.
pub struct BackgroundTask {
	name: Arc<str>,
	class: TaskClass,
	generation: u64,
	cancel: CancellationToken,
	exit: ExitSignal,
}

impl BackgroundTask {
	/// Spawns `body` on the ambient runtime.
	pub fn spawn<F, Fut>(name: impl Into<Arc<str>>, class: TaskClass, generation: u64, body: F) -> Self
	where
		F: FnOnce(CancellationToken) -> Fut,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let name = name.into();
		let cancel = CancellationToken::new();
		let (guard, exit) = exit_pair(Arc::clone(&name));

		let fut = body(cancel.clone());
		let task_name = Arc::clone(&name);
		// Detached: completion is observed through the exit signal.
		drop(spawn(class, async move {
			let _guard = guard;
			fut.await;
			tracing::debug!(task = %task_name, generation, "worker.task_exited");
		}));

		Self {
			name,
			class,
			generation,
			cancel,
			exit,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn class(&self) -> TaskClass {
		self.class
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns a clone of the loop's cancellation token.
	pub fn token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Requests cancellation without waiting for the loop to exit.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Returns true once the loop body has returned (or panicked).
	pub fn is_finished(&self) -> bool {
		self.exit.has_exited()
	}

	/// Cancels the loop and waits until it has exited. Safe to call any
	/// number of times, from any number of callers.
	pub async fn stop(&self) {
		if !self.cancel.is_cancelled() {
			tracing::debug!(task = %self.name, worker_class = self.class.as_str(), generation = self.generation, "worker.stop");
		}
		self.cancel.cancel();
		self.exit.wait().await;
	}

	/// Like [`Self::stop`], but gives up waiting after `timeout`.
	///
	/// Returns `true` if the loop exited in time. Cancellation stays
	/// requested either way.
	pub async fn stop_with_timeout(&self, timeout: Duration) -> bool {
		self.cancel.cancel();
		self.exit.wait_timeout(timeout).await
	}

	/// Waits for the loop to exit on its own, without requesting cancellation.
	pub async fn join(&self) {
		self.exit.wait().await;
	}
}

impl Drop for BackgroundTask {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

impl std::fmt::Debug for BackgroundTask {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BackgroundTask")
			.field("name", &self.name)
			.field("class", &self.class)
			.field("generation", &self.generation)
			.field("cancelled", &self.cancel.is_cancelled())
			.field("finished", &self.is_finished())
			.finish()
	}
}
