//! Errors returned by balancers and the retry dispatcher.

use std::time::Duration;

use thiserror::Error;
use waypoint_endpoint::{BoxError, ContextError};

/// Errors produced by balancers and [`Retry`](crate::Retry).
#[derive(Debug, Error)]
pub enum Error {
	/// The snapshot was empty when a balancer went to pick from it.
	#[error("no endpoints available")]
	NoEndpointsAvailable,

	/// The retry budget ran out. `source` is the last attempt's error,
	/// `errors` holds every attempt's error message in order.
	#[error("retry exhausted after {attempts} attempt(s) in {elapsed:?}: {}", .errors.join("; "))]
	RetryExhausted {
		/// Attempts made, including the last one.
		attempts: usize,
		/// Wall time from the first attempt to giving up.
		elapsed: Duration,
		/// Each attempt's error message, oldest first.
		errors: Vec<String>,
		/// The last attempt's error.
		#[source]
		source: BoxError,
	},

	/// The caller's context finished between attempts.
	#[error("call abandoned after {attempts} attempt(s): {reason}")]
	Cancelled {
		/// Attempts made before the context finished.
		attempts: usize,
		/// Whether the context was cancelled or ran past its deadline.
		#[source]
		reason: ContextError,
	},

	/// A retry budget allowed zero attempts.
	#[error("max_attempts must be greater than zero")]
	InvalidBudget,
}

/// Result type for balancer and retry operations.
pub type Result<T> = std::result::Result<T, Error>;
