//! A node with no inputs: emits an incrementing counter on every step,
//! wrapped in whatever constant fields its `value` parameter supplies.

use async_trait::async_trait;
use chimera_node_kit::base::{Node, RunNodeError};
use chimera_protocol::NodeId;
use std::{collections::BTreeMap, sync::atomic::{AtomicU64, Ordering}};

pub struct Generator {
	value: serde_json::Value,
	count: AtomicU64,
}

impl Generator {
	pub fn new(arguments: serde_json::Value) -> Result<Self, RunNodeError> {
		let value = arguments
			.get("value")
			.cloned()
			.ok_or_else(|| RunNodeError::MissingParameter {
				parameter: "value".into(),
			})?;
		return Ok(Self {
			value,
			count: AtomicU64::new(0),
		});
	}
}

#[async_trait]
impl Node for Generator {
	async fn step(
		&mut self,
		inputs: &BTreeMap<NodeId, Option<serde_json::Value>>,
	) -> Result<Option<serde_json::Value>, RunNodeError> {
		if let Some((producer, _)) = inputs.first_key_value() {
			return Err(RunNodeError::UnrecognizedInput {
				port: producer.to_string().into(),
			});
		}

		let count = self.count.fetch_add(1, Ordering::Relaxed);
		return Ok(Some(serde_json::json!({
			"count": count,
			"value": self.value,
		})));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn counts_up_across_steps() {
		let mut node = Generator::new(serde_json::json!({ "value": "x" })).unwrap();
		let empty = BTreeMap::new();
		let first = node.step(&empty).await.unwrap().unwrap();
		let second = node.step(&empty).await.unwrap().unwrap();
		assert_eq!(first["count"], 0);
		assert_eq!(second["count"], 1);
		assert_eq!(first["value"], "x");
	}

	#[tokio::test]
	async fn rejects_unexpected_input() {
		let mut node = Generator::new(serde_json::json!({ "value": 1 })).unwrap();
		let mut inputs = BTreeMap::new();
		inputs.insert(NodeId::new("Other"), None);
		assert!(matches!(node.step(&inputs).await, Err(RunNodeError::UnrecognizedInput { .. })));
	}

	#[test]
	fn requires_the_value_argument() {
		assert!(matches!(
			Generator::new(serde_json::json!({})),
			Err(RunNodeError::MissingParameter { .. })
		));
	}
}
