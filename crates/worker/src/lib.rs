//! Background task primitives shared by the waypoint crates.
//!
//! * [`spawn`]: spawn on the ambient tokio runtime with a [`TaskClass`] tag
//! * [`BackgroundTask`]: a cancellable loop whose `stop` waits for exit
//! * [`GenerationClock`]: generation IDs for restartable loops

mod class;
mod exit;
mod spawn;
mod task;
mod token;

pub use class::TaskClass;
pub use spawn::spawn;
pub use task::BackgroundTask;
pub use tokio_util::sync::CancellationToken;
pub use token::GenerationClock;
