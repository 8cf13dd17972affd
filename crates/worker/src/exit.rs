use std::time::Duration;

use tokio::sync::watch;

/// Flips to exited when dropped: on normal return, on panic, or when the
/// runtime drops the task.
pub(crate) struct ExitGuard {
	task: std::sync::Arc<str>,
	tx: watch::Sender<bool>,
}

impl Drop for ExitGuard {
	fn drop(&mut self) {
		if std::thread::panicking() {
			tracing::warn!(task = %self.task, "worker.task_panicked");
		}
		self.tx.send_replace(true);
	}
}

/// Observer side of an [`ExitGuard`]. Any number of callers may wait.
#[derive(Clone)]
pub(crate) struct ExitSignal {
	rx: watch::Receiver<bool>,
}

pub(crate) fn exit_pair(task: std::sync::Arc<str>) -> (ExitGuard, ExitSignal) {
	let (tx, rx) = watch::channel(false);
	(ExitGuard { task, tx }, ExitSignal { rx })
}

impl ExitSignal {
	pub(crate) fn has_exited(&self) -> bool {
		*self.rx.borrow()
	}

	pub(crate) async fn wait(&self) {
		let mut rx = self.rx.clone();
		// The guard publishes `true` before its sender goes away, so a closed
		// channel also means exited.
		let _ = rx.wait_for(|exited| *exited).await;
	}

	/// Returns `true` if the task exited within `timeout`.
	pub(crate) async fn wait_timeout(&self, timeout: Duration) -> bool {
		tokio::time::timeout(timeout, self.wait()).await.is_ok()
	}
}
