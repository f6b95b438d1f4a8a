pub mod acker;
pub mod checkpoint;
pub mod component;
pub mod config;
pub mod dedup;
pub mod message;
pub mod observability;
pub mod pipeline;
pub mod reconcile;
pub mod stream;
pub mod wal;

use log::{error, info};

/// Bring the delivery core up without a transport: load configuration, open
/// the WAL and report what state survived the last run. The surrounding
/// deployment provides the gRPC stream and the watch machinery; until those
/// are wired in, this keeps local runs honest about the persisted state.
pub async fn run() {
	let settings = match crate::config::load() {
		Ok(s) => s,
		Err(e) => {
			eprintln!("failed to load config, using defaults: {}", e);
			crate::config::Settings::default()
		}
	};

	if let Err(e) = crate::observability::init_logging(settings.log_level.to_level_filter()) {
		eprintln!("failed to initialize logging: {}", e);
	}

	if let Some(parent) = std::path::Path::new(&settings.wal_path).parent() {
		if let Err(e) = std::fs::create_dir_all(parent) {
			error!("cannot create wal directory {}: {}", parent.display(), e);
			std::process::exit(1);
		}
	}

	let wal = match crate::wal::DedupeWal::open(&settings.wal_path) {
		Ok(wal) => wal,
		Err(e) => {
			error!("cannot open wal at {}: {}", settings.wal_path, e);
			std::process::exit(1);
		}
	};

	match wal.get_map() {
		Ok(state) => info!(
			"event-delivery core ready: {} persisted dedup entries, central endpoint {}",
			state.len(),
			settings.central_endpoint
		),
		Err(e) => {
			error!("cannot read persisted dedup state: {}", e);
			std::process::exit(1);
		}
	}
}
