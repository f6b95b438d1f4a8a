use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use crate::component::SensorComponent;
use crate::dedup::key::{ResourceKey, parse_state};
use crate::message::{
	ComponentEvent, EventAction, MsgFromSensor, MsgToSensor, Resource, SensorEvent,
};
use crate::observability::metrics;

/// Read view over the live in-cluster resource store. The store itself is
/// maintained by the watch machinery upstream; reconciliation only asks
/// whether a key currently exists.
pub trait ClusterStateView: Send + Sync {
	fn contains(&self, key: &ResourceKey) -> bool;
}

// The received flag and the map live under one lock: a reader must never
// observe the flag and the state out of step.
#[derive(Default)]
struct CentralState {
	received: bool,
	hashes: HashMap<ResourceKey, u64>,
}

/// Consumes Central's last-acknowledged dedup state and, once the resync
/// pass completes, emits corrective REMOVE events for resources Central
/// still believes exist but the cluster no longer has.
///
/// State machine: Idle → (state ingested) → StateLoaded → (sync finished)
/// → deletes emitted → StateLoaded. Going offline resets to Idle: the
/// ingested state is cleared and the reconnect cycle's cancellation token
/// is swapped out and cancelled, so an in-flight attempt to push a delete
/// onto a channel nobody drains anymore abandons instead of blocking
/// forever.
pub struct DeduperStateProcessor {
	store: Arc<dyn ClusterStateView>,
	state: RwLock<CentralState>,
	cancel: StdMutex<CancellationToken>,
	responses_tx: mpsc::Sender<MsgFromSensor>,
	responses_rx: StdMutex<Option<mpsc::Receiver<MsgFromSensor>>>,
}

impl DeduperStateProcessor {
	pub fn new(store: Arc<dyn ClusterStateView>, channel_capacity: usize) -> Self {
		let (tx, rx) = mpsc::channel(channel_capacity);
		Self {
			store,
			state: RwLock::new(CentralState::default()),
			cancel: StdMutex::new(CancellationToken::new()),
			responses_tx: tx,
			responses_rx: StdMutex::new(Some(rx)),
		}
	}

	/// One-time-per-connection ingestion of Central's last-acknowledged
	/// hashes. Re-ingesting over non-empty state is suspicious but not
	/// fatal: warn and overwrite.
	pub async fn set_deduper_state(&self, raw: &HashMap<String, u64>) {
		let parsed = parse_state(raw);
		let mut state = self.state.write().await;
		if state.received && !state.hashes.is_empty() {
			warn!(
				"deduper state arrived while {} entries were already loaded; overwriting",
				state.hashes.len()
			);
		}
		state.hashes = parsed;
		state.received = true;
		info!("loaded {} deduper state entries from central", state.hashes.len());
	}

	fn current_token(&self) -> CancellationToken {
		self.cancel.lock().expect("cancel lock poisoned").clone()
	}

	/// Diff Central's view against the live store and push a REMOVE for
	/// every orphan. Runs on the single consumer path that also delivers
	/// OfflineMode, so a cancelled token here always means a dead channel.
	async fn reconcile(&self) {
		let token = self.current_token();

		let orphans: Vec<ResourceKey> = {
			let state = self.state.read().await;
			if !state.received {
				warn!("sync finished before any deduper state arrived; reconciling against an empty baseline");
			}
			state
				.hashes
				.keys()
				.filter(|key| !self.store.contains(key))
				.cloned()
				.collect()
		};

		if orphans.is_empty() {
			debug!("reconciliation found no orphaned resources");
			return;
		}
		info!("reconciliation deleting {} orphaned resources", orphans.len());

		for key in orphans {
			let event = SensorEvent {
				id: key.id.clone(),
				action: EventAction::Remove,
				resource: Resource::empty(key.kind),
			};
			tokio::select! {
				_ = token.cancelled() => {
					debug!("reconciliation abandoned: connection went offline");
					return;
				}
				sent = self.responses_tx.send(MsgFromSensor::Event(event)) => {
					if sent.is_err() {
						warn!("reconciliation response channel closed");
						return;
					}
					metrics().reconcile_deletes_total.inc();
				}
			}
		}
	}

	/// Swap in a fresh cancellation token (cancelling the old one, which
	/// aborts in-flight reconciliation sends) and drop the ingested state,
	/// forcing a fresh ingestion before the next reconciliation means
	/// anything.
	async fn enter_offline_mode(&self) {
		let old = {
			let mut cancel = self.cancel.lock().expect("cancel lock poisoned");
			std::mem::replace(&mut *cancel, CancellationToken::new())
		};
		old.cancel();

		let mut state = self.state.write().await;
		state.hashes.clear();
		state.received = false;
		info!("offline: cleared deduper state, reconciliation disarmed");
	}
}

#[async_trait]
impl SensorComponent for DeduperStateProcessor {
	fn start(&self) -> Result<()> {
		// A fresh cancellable context for the first connection cycle.
		*self.cancel.lock().expect("cancel lock poisoned") = CancellationToken::new();
		Ok(())
	}

	fn stop(&self) {
		self.current_token().cancel();
	}

	async fn notify(&self, event: ComponentEvent) {
		match event {
			ComponentEvent::SyncFinished => self.reconcile().await,
			ComponentEvent::OfflineMode => self.enter_offline_mode().await,
			ComponentEvent::CentralReachable => {}
		}
	}

	async fn process_message(&self, msg: &MsgToSensor) -> Result<()> {
		if let MsgToSensor::DeduperState(state) = msg {
			self.set_deduper_state(&state.resource_hashes).await;
		}
		Ok(())
	}

	fn responses(&self) -> Option<mpsc::Receiver<MsgFromSensor>> {
		self.responses_rx
			.lock()
			.expect("responses lock poisoned")
			.take()
	}
}
