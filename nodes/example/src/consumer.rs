//! A node with exactly one declared input: appends every sample it sees
//! to an in-memory log and flushes it as `samples.jsonl` on collect.

use async_trait::async_trait;
use chimera_node_kit::base::{Node, RunNodeError};
use chimera_protocol::NodeId;
use std::{collections::BTreeMap, path::Path};
use tokio::io::AsyncWriteExt;

pub struct Consumer {
	source: NodeId,
	log: Vec<serde_json::Value>,
}

impl Consumer {
	pub fn new(arguments: serde_json::Value) -> Result<Self, RunNodeError> {
		let source = arguments
			.get("source")
			.and_then(|v| v.as_str())
			.ok_or_else(|| RunNodeError::MissingParameter {
				parameter: "source".into(),
			})?;
		return Ok(Self {
			source: NodeId::new(source),
			log: Vec::new(),
		});
	}
}

#[async_trait]
impl Node for Consumer {
	async fn step(
		&mut self,
		inputs: &BTreeMap<NodeId, Option<serde_json::Value>>,
	) -> Result<Option<serde_json::Value>, RunNodeError> {
		match inputs.get(&self.source) {
			Some(Some(sample)) => self.log.push(sample.clone()),
			Some(None) => {}
			None => {
				return Err(RunNodeError::MissingInput {
					port: self.source.to_string().into(),
				})
			}
		}
		// A consumer has nothing further downstream.
		return Ok(None);
	}

	async fn collect(&mut self, staging_dir: &Path) -> Result<(), RunNodeError> {
		tokio::fs::create_dir_all(staging_dir).await?;
		let mut file = tokio::fs::File::create(staging_dir.join("samples.jsonl")).await?;
		for sample in &self.log {
			let mut line = serde_json::to_string(sample).map_err(|e| RunNodeError::Other(std::sync::Arc::new(e)))?;
			line.push('\n');
			file.write_all(line.as_bytes()).await?;
		}
		return Ok(());
	}

	async fn method(
		&mut self,
		name: &str,
		_params: serde_json::Value,
	) -> Result<serde_json::Value, RunNodeError> {
		match name {
			"sample_count" => Ok(serde_json::json!({ "count": self.log.len() })),
			_ => Err(RunNodeError::UnknownMethod { name: name.into() }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn logs_samples_from_its_declared_source() {
		let mut node = Consumer::new(serde_json::json!({ "source": "Gen1" })).unwrap();
		let mut inputs = BTreeMap::new();
		inputs.insert(NodeId::new("Gen1"), Some(serde_json::json!({ "count": 0 })));
		node.step(&inputs).await.unwrap();
		let count = node.method("sample_count", serde_json::json!({})).await.unwrap();
		assert_eq!(count["count"], 1);
	}

	#[tokio::test]
	async fn missing_input_on_a_step_is_an_error() {
		let mut node = Consumer::new(serde_json::json!({ "source": "Gen1" })).unwrap();
		let inputs = BTreeMap::new();
		assert!(matches!(node.step(&inputs).await, Err(RunNodeError::MissingInput { .. })));
	}

	#[tokio::test]
	async fn unknown_method_is_rejected() {
		let mut node = Consumer::new(serde_json::json!({ "source": "Gen1" })).unwrap();
		assert!(matches!(
			node.method("bogus", serde_json::json!({})).await,
			Err(RunNodeError::UnknownMethod { .. })
		));
	}

	#[tokio::test]
	async fn collect_writes_logged_samples_as_jsonl() {
		let mut node = Consumer::new(serde_json::json!({ "source": "Gen1" })).unwrap();
		let mut inputs = BTreeMap::new();
		inputs.insert(NodeId::new("Gen1"), Some(serde_json::json!({ "count": 7 })));
		node.step(&inputs).await.unwrap();

		let dir = std::env::temp_dir().join(format!(
			"consumer-test-{}-{:?}",
			std::process::id(),
			std::thread::current().id()
		));
		node.collect(&dir).await.unwrap();
		let contents = tokio::fs::read_to_string(dir.join("samples.jsonl")).await.unwrap();
		assert_eq!(contents.trim(), r#"{"count":7}"#);
		tokio::fs::remove_dir_all(&dir).await.unwrap();
	}
}
