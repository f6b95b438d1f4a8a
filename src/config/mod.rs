use log::Level;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Runtime configuration for Outpost.
///
/// Values are loaded from (in order): a config file - in the `/etc/outpost/outpost.json` file,
/// and in the user config folder (optional), and environment variables
/// prefixed with `OUTPOST_` (e.g. `OUTPOST_WAL_PATH`). This is a small, intentionally
/// conservative bootstrap for the project's configuration system.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Settings {
	/// Endpoint of the Central control plane.
	pub central_endpoint: Url,
	/// Path of the dedup write-ahead log database file.
	pub wal_path: String,
	/// Capacity of component response channels (reconciliation deletes).
	pub response_channel_capacity: usize,
	pub log_level: Level,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			central_endpoint: Url::parse("https://central.outpost-system.svc:443").unwrap(),
			wal_path: "/var/lib/outpost/dedupe.redb".to_string(),
			response_channel_capacity: 256,
			log_level: Level::Info,
		}
	}
}

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("configuration error: {0}")]
	Config(#[from] config::ConfigError),
}

pub fn load() -> Result<Settings, SettingsError> {
	let mut builder = config::Config::builder()
		.add_source(config::File::with_name("/etc/outpost/outpost.json").required(false));

	if let Some(folder) = dirs::config_dir() {
		let user_config_path = folder.join("outpost").join("outpost.json");
		builder = builder.add_source(config::File::from(user_config_path).required(false));
	}
	if let Some(folder) = dirs::config_local_dir() {
		let local_config_path = folder.join("outpost").join("outpost.json");
		builder = builder.add_source(config::File::from(local_config_path).required(false));
	}

	builder = builder.add_source(config::Environment::with_prefix("OUTPOST").separator("__"));

	let cfg = builder.build()?;

	let mut s: Settings = cfg.try_deserialize()?;

	// Explicitly prefer direct environment variables when present. Some
	// environments (CI, test harnesses) may set env vars in ways that the
	// `config` crate doesn't map as expected; read them directly to ensure
	// explicit overrides take effect.
	if let Ok(endpoint) = std::env::var("OUTPOST_CENTRAL_ENDPOINT") {
		if !endpoint.is_empty() {
			if let Ok(parsed) = Url::parse(&endpoint) {
				s.central_endpoint = parsed;
			}
		}
	}
	if let Ok(path) = std::env::var("OUTPOST_WAL_PATH") {
		if !path.is_empty() {
			s.wal_path = path;
		}
	}
	if let Ok(capacity) = std::env::var("OUTPOST_RESPONSE_CHANNEL_CAPACITY") {
		if let Ok(parsed) = capacity.parse::<usize>() {
			s.response_channel_capacity = parsed;
		}
	}
	if let Ok(level) = std::env::var("OUTPOST_LOG_LEVEL") {
		if !level.is_empty() {
			if let Ok(parsed) = level.parse::<Level>() {
				s.log_level = parsed;
			}
		}
	}

	Ok(s)
}

#[cfg(test)]
#[cfg(feature = "unit-tests")]
mod tests {
	use std::env;

	use log::Level;

	use crate::config::{Settings, load};

	#[test]
	fn test_load_defaults_and_env_overlay() {
		// Save original values so we can restore them
		let orig_endpoint = env::var_os("OUTPOST_CENTRAL_ENDPOINT");
		let orig_wal = env::var_os("OUTPOST_WAL_PATH");
		let orig_capacity = env::var_os("OUTPOST_RESPONSE_CHANNEL_CAPACITY");
		let orig_level = env::var_os("OUTPOST_LOG_LEVEL");

		// Ensure environment is clean for the defaults check
		unsafe { env::remove_var("OUTPOST_CENTRAL_ENDPOINT") };
		unsafe { env::remove_var("OUTPOST_WAL_PATH") };
		unsafe { env::remove_var("OUTPOST_RESPONSE_CHANNEL_CAPACITY") };
		unsafe { env::remove_var("OUTPOST_LOG_LEVEL") };

		let s = load().expect("load should succeed with defaults");
		let d = Settings::default();
		assert_eq!(s.central_endpoint, d.central_endpoint);
		assert_eq!(s.wal_path, d.wal_path);
		assert_eq!(s.log_level, d.log_level);

		// Overlay environment values and verify they take effect
		unsafe { env::set_var("OUTPOST_CENTRAL_ENDPOINT", "https://central.example:8443") };
		unsafe { env::set_var("OUTPOST_WAL_PATH", "/tmp/outpost-dedupe.redb") };
		unsafe { env::set_var("OUTPOST_RESPONSE_CHANNEL_CAPACITY", "64") };
		unsafe { env::set_var("OUTPOST_LOG_LEVEL", "debug") };

		let s2 = load().expect("load should succeed with env");
		assert_eq!(s2.central_endpoint.as_str(), "https://central.example:8443/");
		assert_eq!(s2.wal_path, "/tmp/outpost-dedupe.redb");
		assert_eq!(s2.response_channel_capacity, 64);
		assert_eq!(s2.log_level, Level::Debug);

		// restore originals
		match orig_endpoint {
			Some(v) => unsafe { env::set_var("OUTPOST_CENTRAL_ENDPOINT", v) },
			None => unsafe { env::remove_var("OUTPOST_CENTRAL_ENDPOINT") },
		}
		match orig_wal {
			Some(v) => unsafe { env::set_var("OUTPOST_WAL_PATH", v) },
			None => unsafe { env::remove_var("OUTPOST_WAL_PATH") },
		}
		match orig_capacity {
			Some(v) => unsafe { env::set_var("OUTPOST_RESPONSE_CHANNEL_CAPACITY", v) },
			None => unsafe { env::remove_var("OUTPOST_RESPONSE_CHANNEL_CAPACITY") },
		}
		match orig_level {
			Some(v) => unsafe { env::set_var("OUTPOST_LOG_LEVEL", v) },
			None => unsafe { env::remove_var("OUTPOST_LOG_LEVEL") },
		}
	}
}
