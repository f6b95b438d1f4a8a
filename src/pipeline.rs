use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio::sync::mpsc;

use crate::acker::MessageAcker;
use crate::checkpoint::CheckpointHandler;
use crate::component::SensorComponent;
use crate::config::Settings;
use crate::dedup::Deduper;
use crate::dedup::key::parse_state;
use crate::message::{ComponentEvent, MsgFromSensor, MsgToSensor};
use crate::reconcile::{ClusterStateView, DeduperStateProcessor};
use crate::stream::SensorMessageStream;
use crate::wal::{DedupeWal, WalError};

/// Wires the event-delivery core together: the WAL, the acker gating its
/// writes, the checkpoint handler driving the acker, and the reconciler.
///
/// The core outlives individual connections to Central. Per connection, the
/// framework wraps its transport stream via [`wrap_stream`](Self::wrap_stream),
/// which seeds a fresh dedup cache from the persisted state; inbound Central
/// messages and connection events are fanned out to the components here.
pub struct SensorCore {
	wal: Arc<DedupeWal>,
	acker: Arc<MessageAcker>,
	reconciler: Arc<DeduperStateProcessor>,
	components: Vec<Arc<dyn SensorComponent>>,
}

impl SensorCore {
	pub fn new(settings: &Settings, store: Arc<dyn ClusterStateView>) -> Result<Self, WalError> {
		let wal = Arc::new(DedupeWal::open(&settings.wal_path)?);
		let acker = Arc::new(MessageAcker::new(Arc::clone(&wal)));
		let checkpoints = Arc::new(CheckpointHandler::new(Arc::clone(&acker)));
		let reconciler = Arc::new(DeduperStateProcessor::new(
			store,
			settings.response_channel_capacity,
		));
		let components: Vec<Arc<dyn SensorComponent>> =
			vec![checkpoints, Arc::clone(&reconciler) as Arc<dyn SensorComponent>];
		Ok(Self {
			wal,
			acker,
			reconciler,
			components,
		})
	}

	pub fn start(&self) -> Result<()> {
		for component in &self.components {
			component.start().context("failed to start component")?;
		}
		Ok(())
	}

	pub fn stop(&self) {
		for component in &self.components {
			component.stop();
		}
	}

	/// Decorates a fresh connection's transport stream with deduplication,
	/// seeded from the WAL so resources Central already acknowledged are not
	/// resent.
	pub fn wrap_stream(
		&self,
		inner: Arc<dyn SensorMessageStream>,
	) -> Result<Deduper, WalError> {
		let persisted = self.wal.get_map()?;
		info!("seeding deduper from {} persisted entries", persisted.len());
		let seed = parse_state(&persisted);
		Ok(Deduper::with_seed(inner, Arc::clone(&self.acker), seed))
	}

	/// Fan one inbound Central message out to every component. The first
	/// component error aborts: a failed WAL flush must surface to the
	/// connection loop.
	pub async fn process_message(&self, msg: &MsgToSensor) -> Result<()> {
		for component in &self.components {
			component.process_message(msg).await?;
		}
		Ok(())
	}

	/// Fan a connection lifecycle event out to every component.
	pub async fn notify(&self, event: ComponentEvent) {
		for component in &self.components {
			component.notify(event).await;
		}
	}

	/// The reconciler's outgoing message channel. Take-once.
	pub fn responses(&self) -> Option<mpsc::Receiver<MsgFromSensor>> {
		self.reconciler.responses()
	}

	pub fn wal(&self) -> &Arc<DedupeWal> {
		&self.wal
	}

	pub fn acker(&self) -> &Arc<MessageAcker> {
		&self.acker
	}
}
