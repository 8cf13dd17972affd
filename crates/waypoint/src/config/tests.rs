use std::io::Write;

use pretty_assertions::assert_eq;

use super::*;

const FULL: &str = r#"
[dispatch]
balancer = "random"
max_attempts = 5
max_time_ms = 250
seed = 7

[registration]
interval_ms = 1000

[registration.service]
id = "svc-1"
name = "strings"
address = "10.0.0.1"
port = 8080
ttl_secs = 30

[registration.service.metadata]
zone = "a"
"#;

#[test]
fn empty_document_uses_defaults() {
	let config = Config::from_toml_str("").unwrap();
	assert_eq!(
		config,
		Config {
			dispatch: DispatchConfig {
				balancer: BalancerKind::RoundRobin,
				max_attempts: 3,
				max_time_ms: 100,
				seed: None,
			},
			registration: None,
		}
	);
	assert_eq!(config.dispatch.max_time(), Duration::from_millis(100));
}

#[test]
fn parses_full_document() {
	let config = Config::from_toml_str(FULL).unwrap();
	assert_eq!(config.dispatch.balancer, BalancerKind::Random);
	assert_eq!(config.dispatch.max_attempts, 5);
	assert_eq!(config.dispatch.seed, Some(7));

	let registration = config.registration.unwrap();
	assert_eq!(registration.interval(), Duration::from_secs(1));

	let service = registration.service.to_service();
	assert_eq!(service.instance(), "10.0.0.1:8080");
	assert_eq!(service.ttl, Duration::from_secs(30));
	assert_eq!(service.metadata.get("zone").map(String::as_str), Some("a"));
}

#[test]
fn registration_interval_defaults_to_thirty_seconds() {
	let config = Config::from_toml_str(
		r#"
[registration.service]
id = "svc-1"
name = "strings"
address = "10.0.0.1"
port = 8080
"#,
	)
	.unwrap();
	let registration = config.registration.unwrap();
	assert_eq!(registration.interval(), Duration::from_secs(30));
	assert_eq!(registration.service.ttl_secs, 0);
}

#[test]
fn zero_attempts_is_invalid() {
	let err = Config::from_toml_str("[dispatch]\nmax_attempts = 0\n").unwrap_err();
	assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "dispatch.max_attempts"), "{err}");
}

#[test]
fn zero_interval_is_invalid() {
	let err = Config::from_toml_str(&FULL.replace("interval_ms = 1000", "interval_ms = 0")).unwrap_err();
	assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "registration.interval_ms"), "{err}");
}

#[test]
fn blank_service_id_is_missing() {
	let err = Config::from_toml_str(&FULL.replace(r#"id = "svc-1""#, r#"id = " ""#)).unwrap_err();
	assert!(matches!(err, ConfigError::MissingField(ref field) if field == "registration.service.id"), "{err}");
}

#[test]
fn unknown_keys_and_balancers_are_rejected() {
	assert!(matches!(Config::from_toml_str("[dispatch]\nretries = 2\n"), Err(ConfigError::Toml(_))));
	assert!(matches!(
		Config::from_toml_str("[dispatch]\nbalancer = \"least_loaded\"\n"),
		Err(ConfigError::Toml(_))
	));
}

#[test]
fn load_reads_file() {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(FULL.as_bytes()).unwrap();

	let config = Config::load(file.path()).unwrap();
	assert_eq!(config.dispatch.max_time_ms, 250);
}

#[test]
fn load_reports_missing_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("absent.toml");
	match Config::load(&path) {
		Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
		other => panic!("unexpected result: {other:?}"),
	}
}

#[test]
fn build_honours_budget() {
	let config = Config::from_toml_str(FULL).unwrap();
	let retry = config
		.dispatch
		.build(waypoint_endpoint::Snapshot::<String, String>::empty())
		.unwrap();
	assert_eq!(retry.max_attempts(), 5);
	assert_eq!(retry.max_time(), Duration::from_millis(250));
}

#[test]
fn build_rejects_hand_made_zero_budget() {
	let dispatch = DispatchConfig {
		max_attempts: 0,
		..DispatchConfig::default()
	};
	let err = dispatch
		.build(waypoint_endpoint::Snapshot::<String, String>::empty())
		.unwrap_err();
	assert!(matches!(err, ConfigError::Dispatch(waypoint_lb::Error::InvalidBudget)));
}
