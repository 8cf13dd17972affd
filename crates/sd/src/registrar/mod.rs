//! Announcing this process's own instance to a registry.
//!
//! Registrars are fire-and-forget: [`Registrar::register`] and
//! [`Registrar::deregister`] log their outcome and never return an error.
//! Tests that need the outcome install an observer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::DiscoveryClient;
use crate::error::{Error, RegistrationAction};
use crate::service::Service;

mod periodic;

pub use periodic::PeriodicRegistrar;

/// Announces or withdraws one service record.
#[async_trait]
pub trait Registrar: Send + Sync {
	async fn register(&self);
	async fn deregister(&self);
}

#[async_trait]
impl<R: Registrar + ?Sized> Registrar for Arc<R> {
	async fn register(&self) {
		(**self).register().await;
	}

	async fn deregister(&self) {
		(**self).deregister().await;
	}
}

/// Outcome of one registry call, handed to a [`RegistrarObserver`].
#[derive(Debug)]
pub enum RegistrarEvent<'a> {
	Registered(&'a Service),
	Deregistered(&'a Service),
	Failed(&'a Error),
}

pub type RegistrarObserver = Arc<dyn Fn(RegistrarEvent<'_>) + Send + Sync>;

/// Registrar that forwards to a [`DiscoveryClient`].
pub struct ClientRegistrar {
	client: Arc<dyn DiscoveryClient>,
	service: Service,
	observer: Option<RegistrarObserver>,
}

impl ClientRegistrar {
	pub fn new(client: Arc<dyn DiscoveryClient>, service: Service) -> Self {
		Self {
			client,
			service,
			observer: None,
		}
	}

	#[must_use]
	pub fn with_observer(mut self, observer: impl Fn(RegistrarEvent<'_>) + Send + Sync + 'static) -> Self {
		self.observer = Some(Arc::new(observer));
		self
	}

	pub fn service(&self) -> &Service {
		&self.service
	}

	fn notify(&self, event: RegistrarEvent<'_>) {
		if let Some(observer) = &self.observer {
			observer(event);
		}
	}

	fn failed(&self, action: RegistrationAction, source: waypoint_endpoint::BoxError) {
		let err = Error::Registration {
			action,
			service_id: self.service.id.clone(),
			source,
		};
		tracing::warn!(service = %self.service.name, id = %self.service.id, action = action.as_str(), error = %err, "registrar.failed");
		self.notify(RegistrarEvent::Failed(&err));
	}
}

#[async_trait]
impl Registrar for ClientRegistrar {
	async fn register(&self) {
		match self.client.register(&self.service).await {
			Ok(()) => {
				tracing::info!(service = %self.service.name, id = %self.service.id, instance = %self.service.instance(), "registrar.register");
				self.notify(RegistrarEvent::Registered(&self.service));
			}
			Err(source) => self.failed(RegistrationAction::Register, source),
		}
	}

	async fn deregister(&self) {
		match self.client.deregister(&self.service).await {
			Ok(()) => {
				tracing::info!(service = %self.service.name, id = %self.service.id, "registrar.deregister");
				self.notify(RegistrarEvent::Deregistered(&self.service));
			}
			Err(source) => self.failed(RegistrationAction::Deregister, source),
		}
	}
}

impl std::fmt::Debug for ClientRegistrar {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClientRegistrar").field("service", &self.service).finish_non_exhaustive()
	}
}
