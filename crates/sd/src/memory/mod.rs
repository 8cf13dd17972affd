//! In-process registry backend.
//!
//! Behaves like a lease-based registry: registering a known instance renews
//! its lease instead of re-adding it, leases with a TTL lapse unless renewed
//! (see [`MemoryRegistry::sweep_expired`]), and every change to a service's
//! instance list is pushed to its watchers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use waypoint_endpoint::BoxError;

use crate::client::DiscoveryClient;
use crate::error::Error;
use crate::service::Service;

struct Lease {
	service: Service,
	renewed_at: Instant,
	heartbeats: u64,
}

struct App {
	/// Keyed by service ID.
	leases: BTreeMap<String, Lease>,
	/// Current instance list, fanned out to watchers.
	tx: watch::Sender<Vec<String>>,
}

impl App {
	fn new() -> Self {
		let (tx, _) = watch::channel(Vec::new());
		Self { leases: BTreeMap::new(), tx }
	}

	fn instances(&self) -> Vec<String> {
		self.leases.values().map(|l| l.service.instance()).collect()
	}

	fn publish(&self) {
		self.tx.send_replace(self.instances());
	}
}

/// Registry that lives entirely in this process.
#[derive(Default)]
pub struct MemoryRegistry {
	apps: Mutex<BTreeMap<String, App>>,
	unavailable: AtomicBool,
}

impl MemoryRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every later register/deregister call fail until switched back.
	pub fn set_unavailable(&self, unavailable: bool) {
		self.unavailable.store(unavailable, Ordering::Release);
	}

	/// Number of lease renewals recorded for an instance, `None` if it is
	/// not registered.
	pub fn heartbeats(&self, name: &str, id: &str) -> Option<u64> {
		self.apps.lock().get(name)?.leases.get(id).map(|l| l.heartbeats)
	}

	pub fn is_registered(&self, name: &str, id: &str) -> bool {
		self.apps.lock().get(name).is_some_and(|app| app.leases.contains_key(id))
	}

	/// Drops every lease whose TTL has lapsed since its last renewal and
	/// returns the IDs removed.
	pub fn sweep_expired(&self) -> Vec<String> {
		let now = Instant::now();
		let mut apps = self.apps.lock();
		let mut expired = Vec::new();
		for app in apps.values_mut() {
			let before = expired.len();
			app.leases.retain(|id, lease| {
				let lapsed = !lease.service.ttl.is_zero() && now.duration_since(lease.renewed_at) > lease.service.ttl;
				if lapsed {
					expired.push(id.clone());
				}
				!lapsed
			});
			if expired.len() != before {
				app.publish();
			}
		}
		if !expired.is_empty() {
			tracing::info!(expired = expired.len(), "registry.sweep");
		}
		expired
	}

	fn check_available(&self) -> Result<(), Error> {
		if self.unavailable.load(Ordering::Acquire) { Err(Error::Unavailable) } else { Ok(()) }
	}

	fn subscribe(&self, name: &str) -> watch::Receiver<Vec<String>> {
		self.apps.lock().entry(name.to_owned()).or_insert_with(App::new).tx.subscribe()
	}
}

#[async_trait]
impl DiscoveryClient for MemoryRegistry {
	async fn entries(&self, name: &str) -> Result<Vec<String>, BoxError> {
		match self.apps.lock().get(name) {
			Some(app) => Ok(app.instances()),
			None => Err(Error::UnknownService(name.to_owned()).into()),
		}
	}

	async fn watch_entries(&self, name: &str, updates: mpsc::Sender<Vec<String>>, stop: CancellationToken) {
		let mut rx = self.subscribe(name);
		loop {
			let list = rx.borrow_and_update().clone();
			tokio::select! {
				biased;
				_ = stop.cancelled() => return,
				sent = updates.send(list) => {
					if sent.is_err() {
						return;
					}
				}
			}
			tokio::select! {
				biased;
				_ = stop.cancelled() => return,
				changed = rx.changed() => {
					if changed.is_err() {
						return;
					}
				}
			}
		}
	}

	async fn register(&self, service: &Service) -> Result<(), BoxError> {
		self.check_available()?;
		let mut apps = self.apps.lock();
		let app = apps.entry(service.name.clone()).or_insert_with(App::new);
		match app.leases.get_mut(&service.id) {
			Some(lease) => {
				lease.renewed_at = Instant::now();
				lease.heartbeats += 1;
				tracing::trace!(service = %service.name, id = %service.id, "registry.heartbeat");
			}
			None => {
				app.leases.insert(
					service.id.clone(),
					Lease {
						service: service.clone(),
						renewed_at: Instant::now(),
						heartbeats: 0,
					},
				);
				app.publish();
			}
		}
		Ok(())
	}

	async fn deregister(&self, service: &Service) -> Result<(), BoxError> {
		self.check_available()?;
		let mut apps = self.apps.lock();
		let removed = apps.get_mut(&service.name).and_then(|app| {
			let lease = app.leases.remove(&service.id)?;
			app.publish();
			Some(lease)
		});
		match removed {
			Some(_) => Ok(()),
			None => Err(Error::UnknownInstance {
				service: service.name.clone(),
				instance: service.id.clone(),
			}
			.into()),
		}
	}
}

impl std::fmt::Debug for MemoryRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let apps = self.apps.lock();
		let mut map = f.debug_map();
		for (name, app) in apps.iter() {
			map.entry(name, &app.instances());
		}
		map.finish()
	}
}

#[cfg(test)]
mod tests;
