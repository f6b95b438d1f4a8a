use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntGauge, Opts, Registry, TextEncoder};

/// Process-wide metrics instance
static GLOBAL_METRICS: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

/// Get a reference to the process-wide metrics registry
pub fn metrics() -> &'static MetricsRegistry {
	&GLOBAL_METRICS
}

/// Central registry for all Prometheus metrics
pub struct MetricsRegistry {
	registry: Registry,

	// Dedup metrics
	pub dedup_hits_total: IntCounter,
	pub dedup_misses_total: IntCounter,
	pub dedup_cache_entries: IntGauge,
	pub events_forwarded_total: IntCounter,

	// Acker / WAL metrics
	pub acker_queue_depth: IntGauge,
	pub wal_ops_flushed_total: IntCounter,
	pub wal_flush_failures_total: IntCounter,
	pub checkpoints_processed_total: IntCounter,

	// Reconciliation metrics
	pub reconcile_deletes_total: IntCounter,
}

impl MetricsRegistry {
	pub fn new() -> Self {
		let registry = Registry::new();

		// Dedup metrics
		let dedup_hits_total = IntCounter::with_opts(
			Opts::new(
				"outpost_dedup_hits_total",
				"Events suppressed because the cached state was unchanged",
			)
			.namespace("outpost"),
		)
		.unwrap();

		let dedup_misses_total = IntCounter::with_opts(
			Opts::new(
				"outpost_dedup_misses_total",
				"Events forwarded because no matching cached state existed",
			)
			.namespace("outpost"),
		)
		.unwrap();

		let dedup_cache_entries = IntGauge::with_opts(
			Opts::new(
				"outpost_dedup_cache_entries",
				"Current number of entries in the dedup cache",
			)
			.namespace("outpost"),
		)
		.unwrap();

		let events_forwarded_total = IntCounter::with_opts(
			Opts::new(
				"outpost_events_forwarded_total",
				"Total messages handed to the underlying transport",
			)
			.namespace("outpost"),
		)
		.unwrap();

		// Acker / WAL metrics
		let acker_queue_depth = IntGauge::with_opts(
			Opts::new(
				"outpost_acker_queue_depth",
				"Pending WAL ops waiting for a Central checkpoint",
			)
			.namespace("outpost"),
		)
		.unwrap();

		let wal_ops_flushed_total = IntCounter::with_opts(
			Opts::new(
				"outpost_wal_ops_flushed_total",
				"WAL ops durably applied after acknowledgement",
			)
			.namespace("outpost"),
		)
		.unwrap();

		let wal_flush_failures_total = IntCounter::with_opts(
			Opts::new(
				"outpost_wal_flush_failures_total",
				"WAL writes that failed during an acknowledged flush",
			)
			.namespace("outpost"),
		)
		.unwrap();

		let checkpoints_processed_total = IntCounter::with_opts(
			Opts::new(
				"outpost_checkpoints_processed_total",
				"Checkpoint acknowledgements received from Central",
			)
			.namespace("outpost"),
		)
		.unwrap();

		// Reconciliation metrics
		let reconcile_deletes_total = IntCounter::with_opts(
			Opts::new(
				"outpost_reconcile_deletes_total",
				"Corrective deletes synthesized after a resync",
			)
			.namespace("outpost"),
		)
		.unwrap();

		// Register all metrics
		registry
			.register(Box::new(dedup_hits_total.clone()))
			.unwrap();
		registry
			.register(Box::new(dedup_misses_total.clone()))
			.unwrap();
		registry
			.register(Box::new(dedup_cache_entries.clone()))
			.unwrap();
		registry
			.register(Box::new(events_forwarded_total.clone()))
			.unwrap();
		registry
			.register(Box::new(acker_queue_depth.clone()))
			.unwrap();
		registry
			.register(Box::new(wal_ops_flushed_total.clone()))
			.unwrap();
		registry
			.register(Box::new(wal_flush_failures_total.clone()))
			.unwrap();
		registry
			.register(Box::new(checkpoints_processed_total.clone()))
			.unwrap();
		registry
			.register(Box::new(reconcile_deletes_total.clone()))
			.unwrap();

		Self {
			registry,
			dedup_hits_total,
			dedup_misses_total,
			dedup_cache_entries,
			events_forwarded_total,
			acker_queue_depth,
			wal_ops_flushed_total,
			wal_flush_failures_total,
			checkpoints_processed_total,
			reconcile_deletes_total,
		}
	}

	/// Encode metrics in Prometheus text format
	pub fn encode(&self) -> String {
		let encoder = TextEncoder::new();
		let metric_families = self.registry.gather();
		match encoder.encode_to_string(&metric_families) {
			Ok(s) => s,
			Err(e) => {
				log::error!("failed to encode metrics: {}", e);
				String::new()
			}
		}
	}
}

impl Default for MetricsRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(feature = "unit-tests")]
mod tests {
	#[test]
	fn metrics_registry_creation() {
		let registry = super::MetricsRegistry::new();
		assert!(!registry.encode().is_empty());
	}

	#[test]
	fn metrics_increment() {
		let registry = super::MetricsRegistry::new();
		registry.dedup_hits_total.inc();
		registry.acker_queue_depth.set(4);
		assert!(!registry.encode().is_empty());
	}
}
