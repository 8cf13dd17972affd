//! Incremental instance → endpoint cache.
//!
//! [`Cache::update`] diffs a new instance set against the current one. New
//! instances go through the factory, vanished ones are unlinked and their
//! handles released, unchanged ones are left alone so middleware state
//! attached to their endpoints survives unrelated churn.
//!
//! Readers go through [`Cache::endpoints`], which loads an `ArcSwap`ed
//! [`Snapshot`] and never touches the writer lock. The writer lock is held
//! across factory calls, so updates are serialized while reads proceed
//! against the previous snapshot until the next one is published whole.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use waypoint_endpoint::{EndpointSource, SharedEndpoint, Snapshot};

use crate::error::Error;
use crate::factory::{Closer, Factory};

/// Notification handed to a [`CacheObserver`].
#[derive(Debug)]
pub enum CacheEvent<'a> {
	/// An endpoint was created for a new instance.
	Added(&'a str),
	/// An instance was unlinked from the visible snapshot.
	Removed(&'a str),
	/// An instance's handle was released.
	Released(&'a str),
	/// The factory failed; the instance will be retried on a later update.
	FactoryFailed(&'a Error),
	/// Releasing a handle failed; the instance is gone regardless.
	ReleaseFailed(&'a Error),
}

/// Callback for cache lifecycle events. Purely a side channel.
pub type CacheObserver = Arc<dyn Fn(CacheEvent<'_>) + Send + Sync>;

struct CacheEntry<Req, Resp> {
	endpoint: SharedEndpoint<Req, Resp>,
	handle: Option<Box<dyn Closer>>,
}

struct Entries<Req, Resp> {
	map: BTreeMap<Arc<str>, CacheEntry<Req, Resp>>,
	closed: bool,
}

/// Materializes a set of instance addresses into live endpoints.
pub struct Cache<Req, Resp> {
	factory: Arc<dyn Factory<Req, Resp>>,
	entries: Mutex<Entries<Req, Resp>>,
	snapshot: ArcSwap<Snapshot<Req, Resp>>,
	observer: Option<CacheObserver>,
}

impl<Req, Resp> Cache<Req, Resp>
where
	Req: 'static,
	Resp: 'static,
{
	/// Creates an empty cache.
	pub fn new(factory: impl Factory<Req, Resp> + 'static) -> Self {
		Self {
			factory: Arc::new(factory),
			entries: Mutex::new(Entries {
				map: BTreeMap::new(),
				closed: false,
			}),
			snapshot: ArcSwap::from_pointee(Snapshot::empty()),
			observer: None,
		}
	}

	/// Installs an observer for cache events.
	#[must_use]
	pub fn with_observer(mut self, observer: impl Fn(CacheEvent<'_>) + Send + Sync + 'static) -> Self {
		self.observer = Some(Arc::new(observer));
		self
	}

	/// Returns the current snapshot. Never blocks on an update in progress.
	pub fn endpoints(&self) -> Snapshot<Req, Resp> {
		Snapshot::clone(&self.snapshot.load())
	}

	pub fn len(&self) -> usize {
		self.snapshot.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshot.load().is_empty()
	}

	/// Instances in the current snapshot, in snapshot order.
	pub fn instances(&self) -> Vec<String> {
		self.snapshot.load().iter().map(|(i, _)| i.to_owned()).collect()
	}

	/// Replaces the instance set.
	///
	/// Returns once every addition has been attempted, the new snapshot is
	/// published and every removed handle has been released. Concurrent
	/// updates queue behind each other. Duplicate addresses collapse.
	pub async fn update<I, S>(&self, instances: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let wanted: BTreeSet<String> = instances.into_iter().map(|s| s.as_ref().to_owned()).collect();

		let mut entries = self.entries.lock().await;
		if entries.closed {
			tracing::debug!(instances = wanted.len(), "cache.update_after_close");
			return;
		}

		let to_remove: Vec<Arc<str>> = entries.map.keys().filter(|k| !wanted.contains(&***k)).cloned().collect();
		let to_add: Vec<String> = wanted.into_iter().filter(|i| !entries.map.contains_key(i.as_str())).collect();

		if to_add.is_empty() && to_remove.is_empty() {
			tracing::trace!(live = entries.map.len(), "cache.update_unchanged");
			return;
		}

		let mut pending = Pending(Vec::with_capacity(to_add.len()));
		let mut failed = 0usize;
		for instance in to_add {
			match self.factory.make(&instance).await {
				Ok(m) => pending.0.push((
					Arc::<str>::from(instance),
					CacheEntry {
						endpoint: m.endpoint,
						handle: m.handle,
					},
				)),
				Err(source) => {
					failed += 1;
					let err = Error::Factory { instance, source };
					tracing::warn!(error = %err, "cache.factory_failed");
					self.notify(CacheEvent::FactoryFailed(&err));
				}
			}
		}

		let mut removed = Vec::with_capacity(to_remove.len());
		for instance in to_remove {
			if let Some(entry) = entries.map.remove(&instance) {
				removed.push((instance, entry));
			}
		}
		let added = std::mem::take(&mut pending.0);
		let added_count = added.len();
		for (instance, entry) in added {
			self.notify(CacheEvent::Added(&instance));
			entries.map.insert(instance, entry);
		}

		self.publish(&entries.map);
		tracing::info!(added = added_count, removed = removed.len(), failed, live = entries.map.len(), "cache.update");

		// Handles are released only after the snapshot that still referenced
		// them has been replaced.
		for (instance, entry) in removed {
			self.notify(CacheEvent::Removed(&instance));
			self.release(&instance, entry);
		}
	}

	/// Releases every remaining handle and publishes an empty snapshot.
	///
	/// Later updates are ignored. Idempotent.
	pub async fn close(&self) {
		let mut entries = self.entries.lock().await;
		if entries.closed {
			return;
		}
		entries.closed = true;
		let drained = std::mem::take(&mut entries.map);
		self.publish(&entries.map);
		tracing::debug!(released = drained.len(), "cache.close");
		for (instance, entry) in drained {
			self.notify(CacheEvent::Removed(&instance));
			self.release(&instance, entry);
		}
	}

	pub async fn is_closed(&self) -> bool {
		self.entries.lock().await.closed
	}

	fn publish(&self, map: &BTreeMap<Arc<str>, CacheEntry<Req, Resp>>) {
		let next = map.iter().map(|(i, e)| (Arc::clone(i), Arc::clone(&e.endpoint))).collect();
		self.snapshot.store(Arc::new(Snapshot::from_entries(next)));
	}

	fn release(&self, instance: &str, entry: CacheEntry<Req, Resp>) {
		drop(entry.endpoint);
		let Some(handle) = entry.handle else {
			return;
		};
		match handle.close() {
			Ok(()) => self.notify(CacheEvent::Released(instance)),
			Err(source) => {
				let err = Error::Release {
					instance: instance.to_owned(),
					source,
				};
				tracing::warn!(error = %err, "cache.release_failed");
				self.notify(CacheEvent::ReleaseFailed(&err));
			}
		}
	}

	fn notify(&self, event: CacheEvent<'_>) {
		if let Some(observer) = &self.observer {
			observer(event);
		}
	}
}

impl<Req, Resp> Drop for Cache<Req, Resp> {
	fn drop(&mut self) {
		let entries = self.entries.get_mut();
		for (instance, entry) in std::mem::take(&mut entries.map) {
			close_quietly(&instance, entry.handle);
		}
	}
}

/// Additions materialized by an in-flight update but not yet linked into the
/// map. If the update future is dropped first, their handles are released
/// here.
struct Pending<Req, Resp>(Vec<(Arc<str>, CacheEntry<Req, Resp>)>);

impl<Req, Resp> Drop for Pending<Req, Resp> {
	fn drop(&mut self) {
		for (instance, entry) in self.0.drain(..) {
			tracing::debug!(instance = %instance, "cache.addition_abandoned");
			close_quietly(&instance, entry.handle);
		}
	}
}

fn close_quietly(instance: &str, handle: Option<Box<dyn Closer>>) {
	let Some(handle) = handle else {
		return;
	};
	if let Err(err) = handle.close() {
		tracing::warn!(instance = %instance, error = %err, "cache.release_failed");
	}
}

impl<Req: 'static, Resp: 'static> EndpointSource<Req, Resp> for Cache<Req, Resp> {
	fn endpoints(&self) -> Snapshot<Req, Resp> {
		Cache::endpoints(self)
	}
}

impl<Req, Resp> std::fmt::Debug for Cache<Req, Resp> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Cache").field("snapshot", &*self.snapshot.load()).finish_non_exhaustive()
	}
}
