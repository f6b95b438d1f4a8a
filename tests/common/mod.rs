#![allow(dead_code)]

/// Common test doubles and builders for integration tests.
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use outpost::dedup::key::ResourceKey;
use outpost::message::{EventAction, MsgFromSensor, Resource, SensorEvent};
use outpost::reconcile::ClusterStateView;
use outpost::stream::SensorMessageStream;

/// Transport stand-in that records every message it is handed.
#[derive(Default)]
pub struct RecordingStream {
	sent: Mutex<Vec<MsgFromSensor>>,
}

impl RecordingStream {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn sent(&self) -> Vec<MsgFromSensor> {
		self.sent.lock().unwrap().clone()
	}

	pub fn sent_count(&self) -> usize {
		self.sent.lock().unwrap().len()
	}
}

#[async_trait]
impl SensorMessageStream for RecordingStream {
	async fn send(&self, msg: MsgFromSensor) -> Result<()> {
		self.sent.lock().unwrap().push(msg);
		Ok(())
	}
}

/// Transport stand-in that refuses every send, as a broken connection would.
pub struct FailingStream;

#[async_trait]
impl SensorMessageStream for FailingStream {
	async fn send(&self, _msg: MsgFromSensor) -> Result<()> {
		anyhow::bail!("stream closed")
	}
}

/// Fixed view of what currently exists in the cluster.
pub struct StaticClusterView {
	keys: HashSet<ResourceKey>,
}

impl StaticClusterView {
	pub fn new(keys: impl IntoIterator<Item = ResourceKey>) -> Arc<Self> {
		Arc::new(Self {
			keys: keys.into_iter().collect(),
		})
	}
}

impl ClusterStateView for StaticClusterView {
	fn contains(&self, key: &ResourceKey) -> bool {
		self.keys.contains(key)
	}
}

/// A deployment event with a payload derived from `name`.
pub fn deployment_event(id: &str, action: EventAction, name: &str) -> MsgFromSensor {
	MsgFromSensor::Event(SensorEvent {
		id: id.to_string(),
		action,
		resource: Resource::Deployment(json!({
			"name": name,
			"namespace": "default",
			"labels": {"app": name},
		})),
	})
}
