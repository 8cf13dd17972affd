use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	/// A required field is missing or empty.
	#[error("missing required field: {0}")]
	MissingField(String),

	/// A field holds a value outside its allowed range.
	#[error("invalid value for {field}: {reason}")]
	Invalid { field: String, reason: String },

	#[error(transparent)]
	Dispatch(#[from] waypoint_lb::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
