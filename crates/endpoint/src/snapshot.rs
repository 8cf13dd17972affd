use std::sync::Arc;

use crate::SharedEndpoint;

/// An immutable, ordered view of the endpoints that were live at one point
/// in time.
///
/// Snapshots are never mutated after they are built. A newer view is a new
/// snapshot; holders of an older one may keep iterating it.
pub struct Snapshot<Req, Resp> {
	entries: Arc<[(Arc<str>, SharedEndpoint<Req, Resp>)]>,
}

impl<Req, Resp> Snapshot<Req, Resp> {
	pub fn empty() -> Self {
		Self { entries: Arc::from(Vec::new()) }
	}

	/// Builds a snapshot from `(instance, endpoint)` pairs, keeping their order.
	pub fn from_entries(entries: Vec<(Arc<str>, SharedEndpoint<Req, Resp>)>) -> Self {
		Self { entries: Arc::from(entries) }
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Endpoint at `index`.
	pub fn get(&self, index: usize) -> Option<&SharedEndpoint<Req, Resp>> {
		self.entries.get(index).map(|(_, e)| e)
	}

	/// Instance address at `index`.
	pub fn instance(&self, index: usize) -> Option<&str> {
		self.entries.get(index).map(|(i, _)| &**i)
	}

	pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &SharedEndpoint<Req, Resp>)> {
		self.entries.iter().map(|(i, e)| (&**i, e))
	}

	pub fn instances(&self) -> Vec<&str> {
		self.entries.iter().map(|(i, _)| &**i).collect()
	}

	pub fn endpoints(&self) -> Vec<SharedEndpoint<Req, Resp>> {
		self.entries.iter().map(|(_, e)| Arc::clone(e)).collect()
	}

	/// True when both values share the same backing storage.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.entries, &other.entries)
	}
}

impl<Req, Resp> Clone for Snapshot<Req, Resp> {
	fn clone(&self) -> Self {
		Self {
			entries: Arc::clone(&self.entries),
		}
	}
}

impl<Req, Resp> Default for Snapshot<Req, Resp> {
	fn default() -> Self {
		Self::empty()
	}
}

impl<Req, Resp> std::fmt::Debug for Snapshot<Req, Resp> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.entries.iter().map(|(i, _)| i)).finish()
	}
}

/// Anything that can hand out the current [`Snapshot`].
///
/// Implemented by caches, subscribers and fixed endpoint sets. Must never
/// block on I/O; an empty snapshot is a valid answer.
pub trait EndpointSource<Req, Resp>: Send + Sync {
	fn endpoints(&self) -> Snapshot<Req, Resp>;
}

impl<Req, Resp, S> EndpointSource<Req, Resp> for Arc<S>
where
	S: EndpointSource<Req, Resp> + ?Sized,
{
	fn endpoints(&self) -> Snapshot<Req, Resp> {
		(**self).endpoints()
	}
}

impl<Req: 'static, Resp: 'static> EndpointSource<Req, Resp> for Snapshot<Req, Resp> {
	fn endpoints(&self) -> Snapshot<Req, Resp> {
		self.clone()
	}
}
