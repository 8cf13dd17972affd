//! Per-call context: cancellation plus an optional deadline.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reason a context stopped a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
	/// The context's cancellation token fired.
	#[error("context cancelled")]
	Cancelled,
	/// The context's deadline passed.
	#[error("context deadline exceeded")]
	DeadlineExceeded,
}

/// Context handed to every [`Endpoint`](crate::Endpoint) call.
///
/// Cheap to clone. Children share the parent's cancellation (cancelling the
/// parent cancels the child, not the reverse) and can only tighten the
/// deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
	cancel: CancellationToken,
	deadline: Option<Instant>,
}

impl Context {
	/// A context that is never cancelled and has no deadline.
	pub fn background() -> Self {
		Self::default()
	}

	/// Wraps an existing cancellation token.
	pub fn with_token(cancel: CancellationToken) -> Self {
		Self { cancel, deadline: None }
	}

	/// Derives a child context with its own cancellation scope.
	#[must_use]
	pub fn child(&self) -> Self {
		Self {
			cancel: self.cancel.child_token(),
			deadline: self.deadline,
		}
	}

	/// Derives a child whose deadline is the earlier of `deadline` and the
	/// current one.
	#[must_use]
	pub fn with_deadline(&self, deadline: Instant) -> Self {
		let deadline = match self.deadline {
			Some(current) if current <= deadline => current,
			_ => deadline,
		};
		Self {
			cancel: self.cancel.child_token(),
			deadline: Some(deadline),
		}
	}

	#[must_use]
	pub fn with_timeout(&self, timeout: Duration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Time left before the deadline; `None` when there is no deadline.
	pub fn remaining(&self) -> Option<Duration> {
		self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Returns why this context is done, if it is.
	pub fn err(&self) -> Option<ContextError> {
		if self.cancel.is_cancelled() {
			return Some(ContextError::Cancelled);
		}
		match self.deadline {
			Some(d) if Instant::now() >= d => Some(ContextError::DeadlineExceeded),
			_ => None,
		}
	}

	/// Resolves when the context is cancelled or its deadline passes.
	pub async fn done(&self) -> ContextError {
		match self.deadline {
			Some(deadline) => tokio::select! {
				_ = self.cancel.cancelled() => ContextError::Cancelled,
				_ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
			},
			None => {
				self.cancel.cancelled().await;
				ContextError::Cancelled
			}
		}
	}

	/// Drives `fut` unless the context finishes first.
	pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
		if let Some(err) = self.err() {
			return Err(err);
		}
		tokio::select! {
			biased;
			err = self.done() => Err(err),
			out = fut => Ok(out),
		}
	}
}
