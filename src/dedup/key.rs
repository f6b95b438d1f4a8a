use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between the kind tag and the resource id in a formatted key.
const KEY_SEPARATOR: char = ':';

/// Defines the closed set of resource kinds together with their stable string
/// tags. Emitting the enum, the `ALL` table, `as_str` and `FromStr` from one
/// macro invocation keeps the string table and the enum from drifting apart.
macro_rules! resource_kinds {
	($(($variant:ident, $tag:literal)),+ $(,)?) => {
		/// Kind of a resource observed in the cluster. The set is closed:
		/// every event flowing through the delivery core carries exactly one
		/// of these tags.
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		pub enum ResourceKind {
			$($variant),+
		}

		impl ResourceKind {
			/// Every kind known to the registry, in declaration order.
			pub const ALL: &'static [ResourceKind] = &[$(ResourceKind::$variant),+];

			/// Stable string tag used in formatted keys and on the wire.
			pub fn as_str(self) -> &'static str {
				match self {
					$(ResourceKind::$variant => $tag),+
				}
			}
		}

		impl FromStr for ResourceKind {
			type Err = KeyError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				match s {
					$($tag => Ok(ResourceKind::$variant),)+
					other => Err(KeyError::UnknownKind(other.to_string())),
				}
			}
		}
	};
}

resource_kinds! {
	(NetworkPolicy, "NetworkPolicy"),
	(Deployment, "Deployment"),
	(Pod, "Pod"),
	(Namespace, "Namespace"),
	(Secret, "Secret"),
	(Node, "Node"),
	(ServiceAccount, "ServiceAccount"),
	(Role, "Role"),
	(Binding, "Binding"),
	(NodeInventory, "NodeInventory"),
	(ProcessIndicator, "ProcessIndicator"),
	(ProviderMetadata, "ProviderMetadata"),
	(OrchestratorMetadata, "OrchestratorMetadata"),
	(ImageIntegration, "ImageIntegration"),
	(ComplianceOperatorResult, "ComplianceOperatorResult"),
	(ComplianceOperatorProfile, "ComplianceOperatorProfile"),
	(ComplianceOperatorRule, "ComplianceOperatorRule"),
	(ComplianceOperatorScanSettingBinding, "ComplianceOperatorScanSettingBinding"),
	(ComplianceOperatorScan, "ComplianceOperatorScan"),
	(AlertResults, "AlertResults"),
	(IndexReport, "IndexReport"),
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Errors produced when parsing formatted dedup keys or kind tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
	#[error("invalid dedup key {0:?}: expected exactly one ':' separator")]
	Format(String),
	#[error("unknown resource kind {0:?}")]
	UnknownKind(String),
}

/// Identity of a resource for deduplication purposes: one live cache entry
/// exists per `(kind, id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
	pub kind: ResourceKind,
	pub id: String,
}

impl ResourceKey {
	pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
		Self {
			kind,
			id: id.into(),
		}
	}
}

/// Formats as `"Kind:ID"`, the representation persisted in the WAL and
/// reported by Central in its dedup state.
impl fmt::Display for ResourceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}{}", self.kind.as_str(), KEY_SEPARATOR, self.id)
	}
}

impl FromStr for ResourceKey {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut parts = s.split(KEY_SEPARATOR);
		let (kind, id) = match (parts.next(), parts.next(), parts.next()) {
			(Some(kind), Some(id), None) => (kind, id),
			_ => return Err(KeyError::Format(s.to_string())),
		};
		Ok(Self {
			kind: kind.parse()?,
			id: id.to_string(),
		})
	}
}

/// Parses a raw `"Kind:ID" -> hash` state map as reported by Central or
/// recovered from the WAL. Entries that fail to parse are logged and
/// skipped: partial corruption must not invalidate the rest of the
/// recovered state.
pub fn parse_state(raw: &HashMap<String, u64>) -> HashMap<ResourceKey, u64> {
	let mut parsed = HashMap::with_capacity(raw.len());
	for (key, &hash) in raw {
		match key.parse::<ResourceKey>() {
			Ok(parsed_key) => {
				parsed.insert(parsed_key, hash);
			}
			Err(e) => {
				warn!("skipping unparseable dedup state entry {:?}: {}", key, e);
			}
		}
	}
	parsed
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::{KeyError, ResourceKey, ResourceKind, parse_state};

	#[test]
	fn test_key_round_trip_all_kinds() {
		for &kind in ResourceKind::ALL {
			let key = ResourceKey::new(kind, "f6f7d086-9893-4a01-a7fc-1fb2b68fbcdc");
			let formatted = key.to_string();
			let parsed: ResourceKey = formatted.parse().expect("formatted key must parse");
			assert_eq!(parsed, key);
		}
	}

	#[test]
	fn test_key_from_rejects_wrong_arity() {
		assert_eq!(
			"Deployment".parse::<ResourceKey>(),
			Err(KeyError::Format("Deployment".to_string()))
		);
		assert_eq!(
			"Deployment:a:b".parse::<ResourceKey>(),
			Err(KeyError::Format("Deployment:a:b".to_string()))
		);
	}

	#[test]
	fn test_key_from_rejects_unknown_kind() {
		assert_eq!(
			"Gizmo:1234".parse::<ResourceKey>(),
			Err(KeyError::UnknownKind("Gizmo".to_string()))
		);
	}

	#[test]
	fn test_kind_tag_round_trip() {
		for &kind in ResourceKind::ALL {
			let parsed: ResourceKind = kind.as_str().parse().expect("tag must parse");
			assert_eq!(parsed, kind);
		}
	}

	#[test]
	fn test_parse_state_skips_malformed_entries() {
		let mut raw = HashMap::new();
		raw.insert("Deployment:1234".to_string(), 77u64);
		raw.insert("Pod:abcd".to_string(), 12u64);
		raw.insert("not-a-key".to_string(), 1u64);
		raw.insert("Gizmo:9".to_string(), 2u64);

		let parsed = parse_state(&raw);
		assert_eq!(parsed.len(), 2);
		assert_eq!(
			parsed.get(&ResourceKey::new(ResourceKind::Deployment, "1234")),
			Some(&77)
		);
		assert_eq!(
			parsed.get(&ResourceKey::new(ResourceKind::Pod, "abcd")),
			Some(&12)
		);
	}
}
