use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation clock for restartable background loops.
///
/// Each start of a loop owned by the same component takes a fresh
/// generation, so log lines from an old loop and its successor can be told
/// apart.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a clock that has issued nothing yet; the first [`Self::next`]
	/// returns 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next generation ID.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Returns the most recently issued generation, or 0 if none.
	pub fn current(&self) -> u64 {
		self.next.load(Ordering::Acquire)
	}
}
