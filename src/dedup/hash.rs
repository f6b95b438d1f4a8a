use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use serde_json::Value;

use crate::message::Resource;

// Discriminant tags keep values of different JSON types from colliding.
const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_ARRAY: u8 = 5;
const TAG_OBJECT: u8 = 6;

/// Canonical 64-bit digest of a resource payload.
///
/// The digest is what gets persisted in the WAL and reported back by Central,
/// so it must be identical for structurally-equal payloads regardless of how
/// they were assembled: object members are hashed in sorted key order
/// (serde_json's map is a BTreeMap, so iteration is already canonical), and
/// the hasher is zero-keyed SipHash rather than a per-process randomized one.
pub fn resource_hash(resource: &Resource) -> u64 {
	let mut hasher = DefaultHasher::new();
	hasher.write(resource.kind().as_str().as_bytes());
	match resource {
		Resource::AlertResults(results) => {
			hasher.write_u8(match results.stage {
				crate::message::DetectionStage::Deploy => 0,
				crate::message::DetectionStage::Runtime => 1,
			});
			hash_value(&results.alerts, &mut hasher);
		}
		Resource::NetworkPolicy(v)
		| Resource::Deployment(v)
		| Resource::Pod(v)
		| Resource::Namespace(v)
		| Resource::Secret(v)
		| Resource::Node(v)
		| Resource::ServiceAccount(v)
		| Resource::Role(v)
		| Resource::Binding(v)
		| Resource::NodeInventory(v)
		| Resource::ProcessIndicator(v)
		| Resource::ProviderMetadata(v)
		| Resource::OrchestratorMetadata(v)
		| Resource::ImageIntegration(v)
		| Resource::ComplianceOperatorResult(v)
		| Resource::ComplianceOperatorProfile(v)
		| Resource::ComplianceOperatorRule(v)
		| Resource::ComplianceOperatorScanSettingBinding(v)
		| Resource::ComplianceOperatorScan(v)
		| Resource::IndexReport(v) => hash_value(v, &mut hasher),
	}
	hasher.finish()
}

fn hash_value(value: &Value, hasher: &mut DefaultHasher) {
	match value {
		Value::Null => hasher.write_u8(TAG_NULL),
		Value::Bool(b) => {
			hasher.write_u8(TAG_BOOL);
			hasher.write_u8(*b as u8);
		}
		Value::Number(n) => {
			// Integers hash by value; anything else falls back to the bit
			// pattern of the f64 representation.
			if let Some(i) = n.as_i64() {
				hasher.write_u8(TAG_INT);
				hasher.write_i64(i);
			} else if let Some(u) = n.as_u64() {
				hasher.write_u8(TAG_INT);
				hasher.write_u64(u);
			} else {
				hasher.write_u8(TAG_FLOAT);
				hasher.write_u64(n.as_f64().unwrap_or(f64::NAN).to_bits());
			}
		}
		Value::String(s) => {
			hasher.write_u8(TAG_STRING);
			hasher.write_u64(s.len() as u64);
			hasher.write(s.as_bytes());
		}
		Value::Array(items) => {
			hasher.write_u8(TAG_ARRAY);
			hasher.write_u64(items.len() as u64);
			for item in items {
				hash_value(item, hasher);
			}
		}
		Value::Object(members) => {
			hasher.write_u8(TAG_OBJECT);
			hasher.write_u64(members.len() as u64);
			for (key, member) in members {
				hasher.write_u64(key.len() as u64);
				hasher.write(key.as_bytes());
				hash_value(member, hasher);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::resource_hash;
	use crate::message::Resource;

	#[test]
	fn test_hash_is_deterministic() {
		let a = Resource::Deployment(json!({"name": "sensor", "replicas": 3}));
		let b = Resource::Deployment(json!({"name": "sensor", "replicas": 3}));
		assert_eq!(resource_hash(&a), resource_hash(&b));
	}

	#[test]
	fn test_hash_ignores_member_insertion_order() {
		// Parsing different textual orderings yields the same map, and the
		// digest must not depend on how members arrived.
		let a: serde_json::Value =
			serde_json::from_str(r#"{"name": "sensor", "replicas": 3}"#).unwrap();
		let b: serde_json::Value =
			serde_json::from_str(r#"{"replicas": 3, "name": "sensor"}"#).unwrap();
		assert_eq!(
			resource_hash(&Resource::Deployment(a)),
			resource_hash(&Resource::Deployment(b))
		);
	}

	#[test]
	fn test_hash_differs_on_payload_change() {
		let a = Resource::Deployment(json!({"replicas": 3}));
		let b = Resource::Deployment(json!({"replicas": 4}));
		assert_ne!(resource_hash(&a), resource_hash(&b));
	}

	#[test]
	fn test_hash_differs_across_kinds() {
		let payload = json!({"name": "shared"});
		let a = Resource::Deployment(payload.clone());
		let b = Resource::Pod(payload);
		assert_ne!(resource_hash(&a), resource_hash(&b));
	}

	#[test]
	fn test_nested_array_order_is_significant() {
		let a = Resource::Pod(json!({"containers": ["app", "sidecar"]}));
		let b = Resource::Pod(json!({"containers": ["sidecar", "app"]}));
		assert_ne!(resource_hash(&a), resource_hash(&b));
	}
}
