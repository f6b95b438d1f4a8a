pub mod hash;
pub mod key;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use tokio::sync::Mutex;

use crate::acker::{MessageAcker, OpKind};
use crate::message::{EventAction, MsgFromSensor, SensorEvent};
use crate::observability::metrics;
use crate::stream::SensorMessageStream;

use hash::resource_hash;
use key::ResourceKey;

/// Last communicated representation of one resource.
///
/// Entries seeded from persisted or Central-reported state carry only the
/// canonical hash; once an event for the key flows through this connection
/// the full payload is cached and comparisons become structural.
struct CacheEntry {
	hash: u64,
	event: Option<SensorEvent>,
}

struct DedupState {
	cache: HashMap<ResourceKey, CacheEntry>,
	// Keys suppressed during the initial resync, drained into the outbound
	// ResourcesSynced signal.
	unchanged: Vec<String>,
}

/// Stream decorator suppressing re-sends of unchanged resource events.
///
/// Wraps the underlying transport stream; the cache is private to one stream
/// instance and dies with the connection. A single mutex is held across the
/// decision, the forward and the cache update, so per-key decisions are
/// linearized and a slow Central naturally throttles producers.
pub struct Deduper {
	inner: Arc<dyn SensorMessageStream>,
	acker: Arc<MessageAcker>,
	state: Mutex<DedupState>,
}

impl Deduper {
	/// A deduper with an empty cache: every first observation forwards.
	pub fn new(inner: Arc<dyn SensorMessageStream>, acker: Arc<MessageAcker>) -> Self {
		Self::with_seed(inner, acker, HashMap::new())
	}

	/// A deduper pre-populated from previously-acknowledged hash state, so a
	/// reconnect does not resend resources Central already has.
	pub fn with_seed(
		inner: Arc<dyn SensorMessageStream>,
		acker: Arc<MessageAcker>,
		seed: HashMap<ResourceKey, u64>,
	) -> Self {
		let cache: HashMap<ResourceKey, CacheEntry> = seed
			.into_iter()
			.map(|(key, hash)| {
				(
					key,
					CacheEntry {
						hash,
						event: None,
					},
				)
			})
			.collect();
		metrics().dedup_cache_entries.set(cache.len() as i64);
		Self {
			inner,
			acker,
			state: Mutex::new(DedupState {
				cache,
				unchanged: Vec::new(),
			}),
		}
	}

	async fn send_event(&self, event: SensorEvent) -> Result<()> {
		let key = event.key();

		if event.action == EventAction::Remove {
			let mut guard = self.state.lock().await;
			guard.cache.remove(&key);
			metrics().dedup_cache_entries.set(guard.cache.len() as i64);
			self.forward(MsgFromSensor::Event(event)).await?;
			self.acker.insert(key.to_string(), 0, OpKind::Remove);
			return Ok(());
		}

		if event.resource.is_always_forward() {
			// No cache consultation and no WAL op: these kinds carry no
			// last-known state worth remembering.
			return self.forward(MsgFromSensor::Event(event)).await;
		}

		let hash = resource_hash(&event.resource);
		let mut guard = self.state.lock().await;
		let state = &mut *guard;

		if let Some(entry) = state.cache.get(&key) {
			let unchanged = match &entry.event {
				Some(cached) => cached.resource == event.resource,
				None => entry.hash == hash,
			};
			if unchanged {
				metrics().dedup_hits_total.inc();
				if event.action == EventAction::Sync {
					state.unchanged.push(key.to_string());
				}
				debug!("suppressed unchanged {}", key);
				return Ok(());
			}
		}
		metrics().dedup_misses_total.inc();

		self.forward(MsgFromSensor::Event(event.clone())).await?;

		// Only a successful send updates the cache: it must reflect what was
		// actually communicated. CREATE and UPDATE normalize to UPDATE so
		// they dedup against each other.
		let mut cached = event;
		if cached.action == EventAction::Create || cached.action == EventAction::Sync {
			cached.action = EventAction::Update;
		}
		state.cache.insert(
			key.clone(),
			CacheEntry {
				hash,
				event: Some(cached),
			},
		);
		metrics().dedup_cache_entries.set(state.cache.len() as i64);
		self.acker.insert(key.to_string(), hash, OpKind::Add);
		Ok(())
	}

	async fn forward(&self, msg: MsgFromSensor) -> Result<()> {
		self.inner.send(msg).await?;
		metrics().events_forwarded_total.inc();
		Ok(())
	}
}

#[async_trait]
impl SensorMessageStream for Deduper {
	async fn send(&self, msg: MsgFromSensor) -> Result<()> {
		match msg {
			MsgFromSensor::Event(event) => self.send_event(event).await,
			MsgFromSensor::ResourcesSynced(mut synced) => {
				// The resync finished: report which keys were left unsent
				// because their state matched what Central already had. The
				// lock stays held across the forward so no racing event can
				// slip between the snapshot and the send.
				let mut guard = self.state.lock().await;
				synced.unchanged_ids.append(&mut guard.unchanged);
				self.forward(MsgFromSensor::ResourcesSynced(synced)).await
			}
		}
	}
}
