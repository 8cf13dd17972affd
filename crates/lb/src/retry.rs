use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use waypoint_endpoint::{BoxError, Context, Endpoint};

use crate::balancer::Balancer;
use crate::error::{Error, Result};

/// Turns a [`Balancer`] into one endpoint that retries failed calls.
///
/// Each attempt picks a fresh endpoint, so a retry usually lands on another
/// instance. A failed pick counts as an attempt. The loop ends on the first
/// success, after `max_attempts` attempts, or once `max_time` has elapsed
/// since the call began. The time budget is checked only between attempts:
/// a call already in flight is never cut short, and the first attempt is
/// always made.
pub struct Retry<B> {
	balancer: B,
	max_attempts: usize,
	max_time: Duration,
}

impl<B> Retry<B> {
	/// # Panics
	///
	/// Panics if `max_attempts` is zero. See [`Self::try_new`].
	pub fn new(max_attempts: usize, max_time: Duration, balancer: B) -> Self {
		assert!(max_attempts > 0, "max_attempts must be > 0");
		Self {
			balancer,
			max_attempts,
			max_time,
		}
	}

	pub fn try_new(max_attempts: usize, max_time: Duration, balancer: B) -> Result<Self> {
		if max_attempts == 0 {
			return Err(Error::InvalidBudget);
		}
		Ok(Self::new(max_attempts, max_time, balancer))
	}

	pub fn max_attempts(&self) -> usize {
		self.max_attempts
	}

	pub fn max_time(&self) -> Duration {
		self.max_time
	}

	pub fn balancer(&self) -> &B {
		&self.balancer
	}
}

impl<B> Retry<B> {
	async fn attempt<Req, Resp>(&self, cx: &Context, req: Req) -> std::result::Result<Resp, BoxError>
	where
		B: Balancer<Req, Resp>,
	{
		let endpoint = self.balancer.pick()?;
		endpoint.call(cx, req).await
	}
}

#[async_trait]
impl<Req, Resp, B> Endpoint<Req, Resp> for Retry<B>
where
	Req: Clone + Send + Sync + 'static,
	Resp: Send + 'static,
	B: Balancer<Req, Resp>,
{
	async fn call(&self, cx: &Context, req: Req) -> std::result::Result<Resp, BoxError> {
		let start = Instant::now();
		let mut errors = Vec::new();
		let mut attempts = 0;
		loop {
			attempts += 1;
			let err = match self.attempt(cx, req.clone()).await {
				Ok(resp) => {
					if attempts > 1 {
						tracing::debug!(attempts, "retry.recovered");
					}
					return Ok(resp);
				}
				Err(err) => err,
			};
			tracing::debug!(attempt = attempts, error = %err, "retry.attempt_failed");
			errors.push(err.to_string());

			let elapsed = start.elapsed();
			if attempts >= self.max_attempts || elapsed >= self.max_time {
				tracing::warn!(attempts, elapsed_ms = elapsed.as_millis() as u64, error = %err, "retry.exhausted");
				return Err(Error::RetryExhausted {
					attempts,
					elapsed,
					errors,
					source: err,
				}
				.into());
			}
			if let Some(reason) = cx.err() {
				tracing::debug!(attempts, %reason, "retry.abandoned");
				return Err(Error::Cancelled { attempts, reason }.into());
			}
		}
	}
}

impl<B> std::fmt::Debug for Retry<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Retry")
			.field("max_attempts", &self.max_attempts)
			.field("max_time", &self.max_time)
			.finish_non_exhaustive()
	}
}
