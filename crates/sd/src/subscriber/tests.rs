use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use waypoint_endpoint::{BoxError, Context, Endpoint, SharedEndpoint, endpoint_fn};

use super::*;
use crate::client::poll_entries;
use crate::factory::{Materialized, factory_fn};
use crate::memory::MemoryRegistry;
use crate::service::Service;

fn named(name: String) -> SharedEndpoint<String, String> {
	Arc::new(endpoint_fn(move |_cx: Context, _req: String| {
		let name = name.clone();
		async move { Ok::<_, BoxError>(name) }
	}))
}

/// Factory that counts released handles.
fn releasing(released: Arc<AtomicUsize>) -> impl Factory<String, String> + 'static {
	factory_fn(move |instance: String| {
		let released = Arc::clone(&released);
		async move {
			if instance.starts_with("bad") {
				return Err::<Materialized<String, String>, BoxError>("refused".into());
			}
			Ok(Materialized::new(named(instance)).with_handle(move || {
				released.fetch_add(1, Ordering::SeqCst);
				Ok::<(), BoxError>(())
			}))
		}
	})
}

fn svc(id: &str, port: u16) -> Service {
	Service::new(id, "strings", "10.0.0.1", port)
}

/// Polls `check` until it holds, letting paused time advance in between.
async fn eventually(mut check: impl FnMut() -> bool) {
	for _ in 0..100 {
		if check() {
			return;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("condition never held");
}

#[tokio::test(start_paused = true)]
async fn follows_registry_changes() {
	let registry = Arc::new(MemoryRegistry::new());
	registry.register(&svc("a", 1)).await.unwrap();
	registry.register(&svc("b", 2)).await.unwrap();

	let released = Arc::new(AtomicUsize::new(0));
	let subscriber = Subscriber::new("strings", registry.clone(), releasing(Arc::clone(&released)));
	eventually(|| subscriber.cache().instances() == ["10.0.0.1:1", "10.0.0.1:2"]).await;

	registry.deregister(&svc("a", 1)).await.unwrap();
	eventually(|| subscriber.cache().instances() == ["10.0.0.1:2"]).await;
	assert_eq!(released.load(Ordering::SeqCst), 1);

	registry.register(&svc("c", 3)).await.unwrap();
	eventually(|| subscriber.endpoints().len() == 2).await;

	let snapshot = subscriber.endpoints();
	let mut answers = Vec::new();
	for (_, endpoint) in snapshot.iter() {
		answers.push(endpoint.call(&Context::background(), String::new()).await.unwrap());
	}
	assert_eq!(answers, vec!["10.0.0.1:2", "10.0.0.1:3"]);

	subscriber.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unknown_service_starts_empty() {
	let registry = Arc::new(MemoryRegistry::new());
	let subscriber = Subscriber::new("strings", registry.clone(), releasing(Arc::new(AtomicUsize::new(0))));
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(subscriber.endpoints().is_empty());

	registry.register(&svc("a", 1)).await.unwrap();
	eventually(|| subscriber.endpoints().len() == 1).await;
	subscriber.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_closes_cache_and_releases_handles() {
	let registry = Arc::new(MemoryRegistry::new());
	registry.register(&svc("a", 1)).await.unwrap();
	registry.register(&svc("b", 2)).await.unwrap();

	let released = Arc::new(AtomicUsize::new(0));
	let subscriber = Subscriber::new("strings", registry.clone(), releasing(Arc::clone(&released)));
	eventually(|| subscriber.endpoints().len() == 2).await;
	assert!(!subscriber.is_stopped());

	subscriber.stop().await;
	assert!(subscriber.is_stopped());
	assert!(subscriber.cache().is_closed().await);
	assert!(subscriber.endpoints().is_empty());
	assert_eq!(released.load(Ordering::SeqCst), 2);

	// Later registry changes no longer reach the cache.
	registry.register(&svc("c", 3)).await.unwrap();
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(subscriber.endpoints().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_stops_both_return() {
	let registry = Arc::new(MemoryRegistry::new());
	let subscriber = Subscriber::new("strings", registry, releasing(Arc::new(AtomicUsize::new(0))));

	tokio::join!(subscriber.stop(), subscriber.stop());
	subscriber.stop().await;
	assert!(subscriber.is_stopped());
}

/// Sends one list, then ends its watch.
struct OneShot;

#[async_trait]
impl DiscoveryClient for OneShot {
	async fn entries(&self, _name: &str) -> Result<Vec<String>, BoxError> {
		Ok(vec!["h:1".into()])
	}

	async fn watch_entries(&self, _name: &str, updates: mpsc::Sender<Vec<String>>, _stop: CancellationToken) {
		let _ = updates.send(vec!["h:1".into()]).await;
	}

	async fn register(&self, _service: &Service) -> Result<(), BoxError> {
		Ok(())
	}

	async fn deregister(&self, _service: &Service) -> Result<(), BoxError> {
		Ok(())
	}
}

#[tokio::test(start_paused = true)]
async fn ended_watch_keeps_last_instances() {
	let subscriber = Subscriber::new("strings", Arc::new(OneShot), releasing(Arc::new(AtomicUsize::new(0))));
	eventually(|| subscriber.endpoints().len() == 1).await;

	tokio::time::sleep(Duration::from_secs(5)).await;
	assert_eq!(subscriber.cache().instances(), vec!["h:1"]);
	assert!(!subscriber.is_stopped());

	subscriber.stop().await;
	assert!(subscriber.endpoints().is_empty());
}

/// Sends one list, then never returns from its watch, ignoring `stop`.
struct Deaf;

#[async_trait]
impl DiscoveryClient for Deaf {
	async fn entries(&self, _name: &str) -> Result<Vec<String>, BoxError> {
		std::future::pending().await
	}

	async fn watch_entries(&self, _name: &str, updates: mpsc::Sender<Vec<String>>, _stop: CancellationToken) {
		let _ = updates.send(vec!["d:1".into()]).await;
		std::future::pending::<()>().await;
	}

	async fn register(&self, _service: &Service) -> Result<(), BoxError> {
		Ok(())
	}

	async fn deregister(&self, _service: &Service) -> Result<(), BoxError> {
		Ok(())
	}
}

#[tokio::test(start_paused = true)]
async fn stop_returns_even_if_watch_ignores_its_token() {
	let released = Arc::new(AtomicUsize::new(0));
	let subscriber = Subscriber::new("strings", Arc::new(Deaf), releasing(Arc::clone(&released)));
	eventually(|| subscriber.endpoints().len() == 1).await;

	tokio::time::timeout(Duration::from_secs(2), subscriber.stop())
		.await
		.expect("stop should not wait on a stuck watch");
	assert!(subscriber.is_stopped());
	assert!(subscriber.cache().is_closed().await);
	assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn polling_stops_during_a_stuck_lookup() {
	let (tx, _rx) = mpsc::channel(1);
	let stop = CancellationToken::new();
	let polling = tokio::spawn({
		let stop = stop.clone();
		async move { poll_entries(&Deaf, "strings", Duration::from_secs(1), tx, stop).await }
	});
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(!polling.is_finished());

	stop.cancel();
	tokio::time::timeout(Duration::from_secs(1), polling)
		.await
		.expect("poll should observe stop while a lookup hangs")
		.unwrap();
}

/// Alternates between a healthy answer and a failure.
#[derive(Default)]
struct Flaky {
	calls: AtomicUsize,
}

#[async_trait]
impl DiscoveryClient for Flaky {
	async fn entries(&self, _name: &str) -> Result<Vec<String>, BoxError> {
		if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
			Ok(vec!["p:1".into(), "p:2".into()])
		} else {
			Err("registry down".into())
		}
	}

	async fn watch_entries(&self, name: &str, updates: mpsc::Sender<Vec<String>>, stop: CancellationToken) {
		poll_entries(self, name, Duration::from_secs(30), updates, stop).await;
	}

	async fn register(&self, _service: &Service) -> Result<(), BoxError> {
		Ok(())
	}

	async fn deregister(&self, _service: &Service) -> Result<(), BoxError> {
		Ok(())
	}
}

#[tokio::test(start_paused = true)]
async fn failed_poll_forwards_empty_list() {
	let client = Flaky::default();
	let (tx, mut rx) = mpsc::channel(4);
	let stop = CancellationToken::new();

	let polling = async {
		poll_entries(&client, "strings", Duration::from_secs(30), tx, stop.clone()).await;
	};
	let collect = async {
		let mut seen = Vec::new();
		for _ in 0..3 {
			seen.push(rx.recv().await.unwrap());
		}
		stop.cancel();
		seen
	};
	let ((), seen) = tokio::join!(polling, collect);

	assert_eq!(seen, vec![vec!["p:1".to_string(), "p:2".to_string()], Vec::new(), vec!["p:1".to_string(), "p:2".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn polling_subscriber_drops_instances_while_registry_fails() {
	let subscriber = Subscriber::new("strings", Arc::new(Flaky::default()), releasing(Arc::new(AtomicUsize::new(0))));
	eventually(|| subscriber.endpoints().len() == 2).await;

	tokio::time::sleep(Duration::from_secs(30)).await;
	eventually(|| subscriber.endpoints().is_empty()).await;

	tokio::time::sleep(Duration::from_secs(30)).await;
	eventually(|| subscriber.endpoints().len() == 2).await;

	subscriber.stop().await;
}

#[tokio::test]
async fn static_subscriber_skips_refused_instances() {
	let released = Arc::new(AtomicUsize::new(0));
	let fixed = StaticSubscriber::new(["s:1", "bad:2", "s:3"], releasing(Arc::clone(&released))).await;
	assert_eq!(fixed.endpoints().instances(), vec!["s:1", "s:3"]);

	fixed.close().await;
	assert!(fixed.endpoints().is_empty());
	assert_eq!(released.load(Ordering::SeqCst), 2);
}
