//! Endpoint selection over a live snapshot, and retrying dispatch.
//!
//! * [`Balancer`]: picks one endpoint per call ([`RoundRobin`], [`Random`])
//! * [`Retry`]: wraps a balancer into a single endpoint with an attempt and
//!   time budget

mod balancer;
mod error;
mod random;
mod retry;
mod round_robin;

pub use balancer::Balancer;
pub use error::{Error, Result};
pub use random::Random;
pub use retry::Retry;
pub use round_robin::RoundRobin;
