//! Service discovery for waypoint clients.
//!
//! A [`Subscriber`] follows one service in a registry and keeps a [`Cache`]
//! of live endpoints for its instances. A [`Registrar`] announces this
//! process's own instance, and [`PeriodicRegistrar`] keeps that
//! announcement renewed.

mod cache;
mod client;
mod error;
mod factory;
mod memory;
mod registrar;
mod service;
mod subscriber;

pub use cache::{Cache, CacheEvent, CacheObserver};
pub use client::{DiscoveryClient, poll_entries};
pub use error::{Error, RegistrationAction, Result};
pub use factory::{Closer, Factory, FnFactory, Materialized, factory_fn};
pub use memory::MemoryRegistry;
pub use registrar::{ClientRegistrar, PeriodicRegistrar, Registrar, RegistrarEvent, RegistrarObserver};
pub use service::Service;
pub use subscriber::{StaticSubscriber, Subscriber};
