use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::dedup::key::{ResourceKey, ResourceKind};

/// Action carried by a resource event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventAction {
	Create,
	Update,
	Remove,
	Sync,
}

/// Stage at which an alert evaluation ran. Runtime results are emitted for
/// every process observation and must never be suppressed; deploy-time
/// results describe stable resource state and dedup like any other kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionStage {
	Deploy,
	Runtime,
}

/// Alert evaluation results for one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResults {
	pub stage: DetectionStage,
	pub alerts: Value,
}

/// Closed union of resource payloads, one variant per registered kind.
///
/// The variant tag is the single source of the event's kind; there is no
/// runtime type inspection anywhere in the pipeline. Payloads are JSON
/// documents as produced by the watch machinery upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resource {
	NetworkPolicy(Value),
	Deployment(Value),
	Pod(Value),
	Namespace(Value),
	Secret(Value),
	Node(Value),
	ServiceAccount(Value),
	Role(Value),
	Binding(Value),
	NodeInventory(Value),
	ProcessIndicator(Value),
	ProviderMetadata(Value),
	OrchestratorMetadata(Value),
	ImageIntegration(Value),
	ComplianceOperatorResult(Value),
	ComplianceOperatorProfile(Value),
	ComplianceOperatorRule(Value),
	ComplianceOperatorScanSettingBinding(Value),
	ComplianceOperatorScan(Value),
	AlertResults(AlertResults),
	IndexReport(Value),
}

impl Resource {
	/// The registered kind of this payload.
	pub fn kind(&self) -> ResourceKind {
		match self {
			Resource::NetworkPolicy(_) => ResourceKind::NetworkPolicy,
			Resource::Deployment(_) => ResourceKind::Deployment,
			Resource::Pod(_) => ResourceKind::Pod,
			Resource::Namespace(_) => ResourceKind::Namespace,
			Resource::Secret(_) => ResourceKind::Secret,
			Resource::Node(_) => ResourceKind::Node,
			Resource::ServiceAccount(_) => ResourceKind::ServiceAccount,
			Resource::Role(_) => ResourceKind::Role,
			Resource::Binding(_) => ResourceKind::Binding,
			Resource::NodeInventory(_) => ResourceKind::NodeInventory,
			Resource::ProcessIndicator(_) => ResourceKind::ProcessIndicator,
			Resource::ProviderMetadata(_) => ResourceKind::ProviderMetadata,
			Resource::OrchestratorMetadata(_) => ResourceKind::OrchestratorMetadata,
			Resource::ImageIntegration(_) => ResourceKind::ImageIntegration,
			Resource::ComplianceOperatorResult(_) => ResourceKind::ComplianceOperatorResult,
			Resource::ComplianceOperatorProfile(_) => ResourceKind::ComplianceOperatorProfile,
			Resource::ComplianceOperatorRule(_) => ResourceKind::ComplianceOperatorRule,
			Resource::ComplianceOperatorScanSettingBinding(_) => {
				ResourceKind::ComplianceOperatorScanSettingBinding
			}
			Resource::ComplianceOperatorScan(_) => ResourceKind::ComplianceOperatorScan,
			Resource::AlertResults(_) => ResourceKind::AlertResults,
			Resource::IndexReport(_) => ResourceKind::IndexReport,
		}
	}

	/// Whether this payload must be forwarded on every observation, bypassing
	/// the dedup cache. Process indicators and index reports are unbounded
	/// observation streams, and runtime alert results accompany them.
	pub fn is_always_forward(&self) -> bool {
		match self {
			Resource::ProcessIndicator(_) | Resource::IndexReport(_) => true,
			Resource::AlertResults(results) => results.stage == DetectionStage::Runtime,
			_ => false,
		}
	}

	/// Builds an empty payload of the given kind. Used when synthesizing
	/// corrective REMOVE events during reconciliation, where only the
	/// identity matters to Central.
	pub fn empty(kind: ResourceKind) -> Self {
		let body = || Value::Object(serde_json::Map::new());
		match kind {
			ResourceKind::NetworkPolicy => Resource::NetworkPolicy(body()),
			ResourceKind::Deployment => Resource::Deployment(body()),
			ResourceKind::Pod => Resource::Pod(body()),
			ResourceKind::Namespace => Resource::Namespace(body()),
			ResourceKind::Secret => Resource::Secret(body()),
			ResourceKind::Node => Resource::Node(body()),
			ResourceKind::ServiceAccount => Resource::ServiceAccount(body()),
			ResourceKind::Role => Resource::Role(body()),
			ResourceKind::Binding => Resource::Binding(body()),
			ResourceKind::NodeInventory => Resource::NodeInventory(body()),
			ResourceKind::ProcessIndicator => Resource::ProcessIndicator(body()),
			ResourceKind::ProviderMetadata => Resource::ProviderMetadata(body()),
			ResourceKind::OrchestratorMetadata => Resource::OrchestratorMetadata(body()),
			ResourceKind::ImageIntegration => Resource::ImageIntegration(body()),
			ResourceKind::ComplianceOperatorResult => Resource::ComplianceOperatorResult(body()),
			ResourceKind::ComplianceOperatorProfile => Resource::ComplianceOperatorProfile(body()),
			ResourceKind::ComplianceOperatorRule => Resource::ComplianceOperatorRule(body()),
			ResourceKind::ComplianceOperatorScanSettingBinding => {
				Resource::ComplianceOperatorScanSettingBinding(body())
			}
			ResourceKind::ComplianceOperatorScan => Resource::ComplianceOperatorScan(body()),
			ResourceKind::AlertResults => Resource::AlertResults(AlertResults {
				stage: DetectionStage::Deploy,
				alerts: Value::Null,
			}),
			ResourceKind::IndexReport => Resource::IndexReport(body()),
		}
	}
}

/// One observed resource change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
	pub id: String,
	pub action: EventAction,
	pub resource: Resource,
}

impl SensorEvent {
	/// Dedup identity of this event, derived from the typed payload.
	pub fn key(&self) -> ResourceKey {
		ResourceKey::new(self.resource.kind(), self.id.clone())
	}
}

/// Signal sent to Central once the initial resync pass finished, listing the
/// `"Kind:ID"` keys whose state was unchanged and therefore not re-sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcesSynced {
	pub unchanged_ids: Vec<String>,
}

/// Message flowing Sensor → Central.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MsgFromSensor {
	Event(SensorEvent),
	ResourcesSynced(ResourcesSynced),
}

/// Central's acknowledgement that every operation up to `seq` is safely
/// recorded on its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointAck {
	pub seq: u64,
}

/// Central's snapshot of the last dedup state it acknowledged, keyed by
/// formatted `"Kind:ID"` strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeduperState {
	pub resource_hashes: HashMap<String, u64>,
}

/// Message flowing Central → Sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MsgToSensor {
	Checkpoint(CheckpointAck),
	DeduperState(DeduperState),
}

/// Connection lifecycle notifications fanned out to components by the
/// surrounding framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentEvent {
	/// The initial resource resync with Central completed.
	SyncFinished,
	/// The connection to Central was lost.
	OfflineMode,
	/// A connection to Central was (re)established.
	CentralReachable,
}
