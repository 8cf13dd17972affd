//! Endpoint abstraction for dynamic dispatch.
//!
//! * [`Endpoint`]: one callable remote procedure, `(context, request) -> response`
//! * [`Context`]: cancellation and deadline carried through a call
//! * [`Snapshot`]: immutable, ordered set of live endpoints
//! * [`EndpointSource`]: anything that can hand out the current snapshot
//! * [`ServiceEndpoint`] / [`EndpointService`]: bridges to `tower_service::Service`

mod context;
mod endpoint;
mod service;
mod snapshot;

pub use context::{Context, ContextError};
pub use endpoint::{BoxError, Endpoint, FnEndpoint, SharedEndpoint, endpoint_fn};
pub use service::{EndpointService, ServiceEndpoint};
pub use snapshot::{EndpointSource, Snapshot};
