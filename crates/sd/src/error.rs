//! Error types for discovery, caching and registration.

use thiserror::Error;
use waypoint_endpoint::BoxError;

/// Which registry call a [`Error::Registration`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationAction {
	/// Announcing or renewing the service.
	Register,
	/// Withdrawing the service.
	Deregister,
}

impl RegistrationAction {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Register => "register",
			Self::Deregister => "deregister",
		}
	}
}

impl std::fmt::Display for RegistrationAction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Errors produced by this crate.
///
/// Factory, release and registration failures are contained where they
/// happen: they are logged and handed to observers, never returned from an
/// update or a register call.
#[derive(Debug, Error)]
pub enum Error {
	/// The factory could not build an endpoint for an instance.
	#[error("factory failed for instance {instance}: {source}")]
	Factory {
		/// Address the factory was asked to materialize.
		instance: String,
		/// The factory's error.
		#[source]
		source: BoxError,
	},

	/// Releasing a removed instance's resource handle failed.
	#[error("releasing instance {instance} failed: {source}")]
	Release {
		/// Address whose handle was being released.
		instance: String,
		/// The handle's error.
		#[source]
		source: BoxError,
	},

	/// A registry call made on behalf of this process failed.
	#[error("{action} of service {service_id} failed: {source}")]
	Registration {
		/// Which call failed.
		action: RegistrationAction,
		/// ID of the service being registered or withdrawn.
		service_id: String,
		/// The registry's error.
		#[source]
		source: BoxError,
	},

	/// The registry has never seen the named service.
	#[error("unknown service: {0}")]
	UnknownService(String),

	/// The registry has no such instance under the service.
	#[error("instance {instance} is not registered under {service}")]
	UnknownInstance {
		/// Service name the lookup was made under.
		service: String,
		/// Instance ID that was not found.
		instance: String,
	},

	/// The registry refused the call.
	#[error("registry unavailable")]
	Unavailable,
}

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, Error>;
