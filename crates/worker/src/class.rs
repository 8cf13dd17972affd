/// Execution classes for background work, used for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Loops that follow a discovery backend and feed endpoint caches.
	Subscription,
	/// Loops that renew this process's own registration lease.
	Renewal,
	/// Any other background async work.
	Background,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Subscription => "subscription",
			Self::Renewal => "renewal",
			Self::Background => "background",
		}
	}
}
