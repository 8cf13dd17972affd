//! Fault-tolerant calls against a changing set of service instances.
//!
//! A [`Subscriber`] turns a registry's instance list into live endpoints, a
//! [`Balancer`] picks one per call, and [`Retry`] wraps the balancer into a
//! single endpoint with an attempt and time budget. [`PeriodicRegistrar`]
//! keeps this process's own instance announced.
//!
//! ```ignore
//! let config = Config::load("waypoint.toml")?;
//! let subscriber = Subscriber::new("strings", registry.clone(), factory);
//! let subscriber = Arc::new(subscriber);
//! let dispatch = config.dispatch.build(subscriber.clone())?;
//! let reply = dispatch.call(&Context::background(), request).await?;
//! ```

pub mod config;

pub use config::{BalancerKind, Config, ConfigError, DispatchConfig, RegistrationConfig, ServiceConfig};
pub use waypoint_endpoint::{
	BoxError, Context, ContextError, Endpoint, EndpointService, EndpointSource, ServiceEndpoint, SharedEndpoint, Snapshot, endpoint_fn,
};
pub use waypoint_lb::{Balancer, Random, Retry, RoundRobin};
pub use waypoint_sd::{
	Cache, ClientRegistrar, DiscoveryClient, Factory, Materialized, MemoryRegistry, PeriodicRegistrar, Registrar, Service, StaticSubscriber,
	Subscriber, factory_fn,
};
pub use waypoint_worker::CancellationToken;
pub use {waypoint_endpoint as endpoint, waypoint_lb as lb, waypoint_sd as sd, waypoint_worker as worker};
