use std::collections::BTreeMap;
use std::time::Duration;

/// This process's own instance record, as announced to a registry.
///
/// Built once and handed to a registrar; not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
	pub id: String,
	pub name: String,
	pub address: String,
	pub port: u16,
	pub metadata: BTreeMap<String, String>,
	/// Lease length requested from the registry. Zero means no lease.
	pub ttl: Duration,
}

impl Service {
	pub fn new(id: impl Into<String>, name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			address: address.into(),
			port,
			metadata: BTreeMap::new(),
			ttl: Duration::ZERO,
		}
	}

	#[must_use]
	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	#[must_use]
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;
		self
	}

	/// The instance address other processes discover this service under.
	pub fn instance(&self) -> String {
		format!("{}:{}", self.address, self.port)
	}
}
