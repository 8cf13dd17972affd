use std::sync::Arc;
use std::time::Duration;

use super::*;

fn svc(id: &str, port: u16) -> Service {
	Service::new(id, "strings", "10.0.0.1", port)
}

#[tokio::test]
async fn register_then_reregister_heartbeats() {
	let registry = MemoryRegistry::new();
	let s = svc("a", 8080);

	registry.register(&s).await.unwrap();
	assert_eq!(registry.entries("strings").await.unwrap(), vec!["10.0.0.1:8080"]);
	assert_eq!(registry.heartbeats("strings", "a"), Some(0));

	registry.register(&s).await.unwrap();
	registry.register(&s).await.unwrap();
	assert_eq!(registry.heartbeats("strings", "a"), Some(2));
	assert_eq!(registry.entries("strings").await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_service_and_instance_are_errors() {
	let registry = MemoryRegistry::new();
	let err = registry.entries("nope").await.unwrap_err();
	assert!(matches!(err.downcast_ref::<Error>(), Some(Error::UnknownService(name)) if name == "nope"));

	let err = registry.deregister(&svc("a", 1)).await.unwrap_err();
	assert!(matches!(err.downcast_ref::<Error>(), Some(Error::UnknownInstance { .. })));
}

#[tokio::test]
async fn unavailable_registry_refuses_calls() {
	let registry = MemoryRegistry::new();
	registry.set_unavailable(true);
	assert!(registry.register(&svc("a", 1)).await.is_err());
	assert!(!registry.is_registered("strings", "a"));

	registry.set_unavailable(false);
	registry.register(&svc("a", 1)).await.unwrap();
	assert!(registry.is_registered("strings", "a"));
}

#[tokio::test(start_paused = true)]
async fn leases_lapse_without_renewal() {
	let registry = MemoryRegistry::new();
	let leased = svc("leased", 1).with_ttl(Duration::from_secs(10));
	let forever = svc("forever", 2);
	registry.register(&leased).await.unwrap();
	registry.register(&forever).await.unwrap();

	tokio::time::advance(Duration::from_secs(6)).await;
	registry.register(&leased).await.unwrap();
	tokio::time::advance(Duration::from_secs(6)).await;
	assert!(registry.sweep_expired().is_empty(), "renewed lease must survive");

	tokio::time::advance(Duration::from_secs(5)).await;
	assert_eq!(registry.sweep_expired(), vec!["leased".to_string()]);
	assert_eq!(registry.entries("strings").await.unwrap(), vec!["10.0.0.1:2"]);
}

#[tokio::test]
async fn watchers_see_current_list_and_changes() {
	let registry = Arc::new(MemoryRegistry::new());
	registry.register(&svc("a", 1)).await.unwrap();

	let (tx, mut rx) = mpsc::channel(4);
	let stop = CancellationToken::new();
	let watcher = {
		let registry = Arc::clone(&registry);
		let stop = stop.clone();
		tokio::spawn(async move { registry.watch_entries("strings", tx, stop).await })
	};

	assert_eq!(rx.recv().await.unwrap(), vec!["10.0.0.1:1"]);

	registry.register(&svc("b", 2)).await.unwrap();
	assert_eq!(rx.recv().await.unwrap(), vec!["10.0.0.1:1", "10.0.0.1:2"]);

	registry.deregister(&svc("a", 1)).await.unwrap();
	assert_eq!(rx.recv().await.unwrap(), vec!["10.0.0.1:2"]);

	stop.cancel();
	tokio::time::timeout(Duration::from_secs(1), watcher).await.unwrap().unwrap();
}

#[tokio::test]
async fn watching_an_unknown_service_starts_empty() {
	let registry = Arc::new(MemoryRegistry::new());
	let (tx, mut rx) = mpsc::channel(4);
	let stop = CancellationToken::new();
	let watcher = {
		let registry = Arc::clone(&registry);
		let stop = stop.clone();
		tokio::spawn(async move { registry.watch_entries("later", tx, stop).await })
	};

	assert_eq!(rx.recv().await.unwrap(), Vec::<String>::new());
	registry.register(&Service::new("x", "later", "h", 9)).await.unwrap();
	assert_eq!(rx.recv().await.unwrap(), vec!["h:9"]);

	drop(rx);
	registry.register(&Service::new("y", "later", "h", 10)).await.unwrap();
	tokio::time::timeout(Duration::from_secs(1), watcher).await.unwrap().unwrap();
	drop(stop);
}
