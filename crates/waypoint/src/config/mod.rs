//! TOML configuration for dispatch and self-registration.
//!
//! ```toml
//! [dispatch]
//! balancer = "round_robin"   # or "random"
//! max_attempts = 3
//! max_time_ms = 100
//!
//! [registration]
//! interval_ms = 30000
//!
//! [registration.service]
//! id = "svc-1"
//! name = "strings"
//! address = "10.0.0.1"
//! port = 8080
//! ttl_secs = 30
//!
//! [registration.service.metadata]
//! zone = "a"
//! ```
//!
//! Every key under `[dispatch]` is optional. `[registration]` may be left
//! out entirely for processes that only call other services.

mod error;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use waypoint_endpoint::EndpointSource;
use waypoint_lb::{Balancer, Random, Retry, RoundRobin};
use waypoint_sd::{ClientRegistrar, DiscoveryClient, PeriodicRegistrar, Service};

pub use error::{ConfigError, Result};

const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_MAX_TIME_MS: u64 = 100;
const DEFAULT_INTERVAL_MS: u64 = 30_000;

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub dispatch: DispatchConfig,
	pub registration: Option<RegistrationConfig>,
}

impl Config {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let config: Config = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		let config = Self::from_toml_str(&content)?;
		tracing::debug!(path = %path.display(), registration = config.registration.is_some(), "config.loaded");
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		self.dispatch.validate()?;
		if let Some(registration) = &self.registration {
			registration.validate()?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancerKind {
	#[default]
	RoundRobin,
	Random,
}

/// Settings for the retrying dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
	pub balancer: BalancerKind,
	pub max_attempts: usize,
	pub max_time_ms: u64,
	/// Fixes the random balancer's sequence. Ignored by round robin.
	pub seed: Option<u64>,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			balancer: BalancerKind::default(),
			max_attempts: DEFAULT_MAX_ATTEMPTS,
			max_time_ms: DEFAULT_MAX_TIME_MS,
			seed: None,
		}
	}
}

impl DispatchConfig {
	pub fn max_time(&self) -> Duration {
		Duration::from_millis(self.max_time_ms)
	}

	fn validate(&self) -> Result<()> {
		if self.max_attempts == 0 {
			return Err(ConfigError::Invalid {
				field: "dispatch.max_attempts".into(),
				reason: "must be greater than zero".into(),
			});
		}
		Ok(())
	}

	/// The configured balancer over `source`.
	pub fn balancer<Req, Resp, S>(&self, source: S) -> Box<dyn Balancer<Req, Resp>>
	where
		Req: 'static,
		Resp: 'static,
		S: EndpointSource<Req, Resp> + 'static,
	{
		match (self.balancer, self.seed) {
			(BalancerKind::RoundRobin, _) => Box::new(RoundRobin::new(source)),
			(BalancerKind::Random, Some(seed)) => Box::new(Random::with_seed(source, seed)),
			(BalancerKind::Random, None) => Box::new(Random::new(source)),
		}
	}

	/// Assembles the retrying dispatcher over `source`.
	pub fn build<Req, Resp, S>(&self, source: S) -> Result<Retry<Box<dyn Balancer<Req, Resp>>>>
	where
		Req: 'static,
		Resp: 'static,
		S: EndpointSource<Req, Resp> + 'static,
	{
		Ok(Retry::try_new(self.max_attempts, self.max_time(), self.balancer(source))?)
	}
}

/// Settings for announcing this process to a registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
	#[serde(default = "default_interval_ms")]
	pub interval_ms: u64,
	pub service: ServiceConfig,
}

fn default_interval_ms() -> u64 {
	DEFAULT_INTERVAL_MS
}

impl RegistrationConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}

	fn validate(&self) -> Result<()> {
		if self.interval_ms == 0 {
			return Err(ConfigError::Invalid {
				field: "registration.interval_ms".into(),
				reason: "must be greater than zero".into(),
			});
		}
		self.service.validate()
	}

	/// A registrar that keeps the configured service registered with `client`.
	pub fn periodic(&self, client: Arc<dyn DiscoveryClient>) -> Result<PeriodicRegistrar<ClientRegistrar>> {
		self.validate()?;
		Ok(PeriodicRegistrar::new(ClientRegistrar::new(client, self.service.to_service()), self.interval()))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
	pub id: String,
	pub name: String,
	pub address: String,
	pub port: u16,
	/// Lease TTL in seconds; 0 means the lease never lapses.
	#[serde(default)]
	pub ttl_secs: u64,
	#[serde(default)]
	pub metadata: BTreeMap<String, String>,
}

impl ServiceConfig {
	fn validate(&self) -> Result<()> {
		for (field, value) in [("id", &self.id), ("name", &self.name), ("address", &self.address)] {
			if value.trim().is_empty() {
				return Err(ConfigError::MissingField(format!("registration.service.{field}")));
			}
		}
		Ok(())
	}

	pub fn to_service(&self) -> Service {
		self.metadata
			.iter()
			.fold(Service::new(&self.id, &self.name, &self.address, self.port), |service, (k, v)| {
				service.with_metadata(k, v)
			})
			.with_ttl(Duration::from_secs(self.ttl_secs))
	}
}

#[cfg(test)]
mod tests;
