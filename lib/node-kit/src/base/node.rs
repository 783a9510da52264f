use async_trait::async_trait;
use chimera_protocol::NodeId;
use smartstring::{LazyCompact, SmartString};
use std::{collections::BTreeMap, path::Path};

use super::RunNodeError;

#[derive(Clone)]
pub struct ThisNodeInfo {
	pub id: NodeId,
	pub node_type: SmartString<LazyCompact>,
}

/// The interface a user-defined computation implements.
///
/// Re-architected from the source's metaclass-wrapped `step` (§9): `step`
/// itself returns a raw value, and [`crate::NodeRuntime`] is the only
/// place that tags it with a producer id and timestamp. No inheritance
/// magic is required to get that tagging — it's just what the runtime
/// does with the return value.
#[async_trait]
pub trait Node: Send + Sync {
	/// Called once, after construction and before the control loop starts
	/// servicing signals.
	async fn setup(&mut self) -> Result<(), RunNodeError> {
		Ok(())
	}

	/// Produce this node's next sample given the latest available sample
	/// from each declared input. `None` means this step produced nothing
	/// to publish.
	async fn step(
		&mut self,
		inputs: &BTreeMap<NodeId, Option<serde_json::Value>>,
	) -> Result<Option<serde_json::Value>, RunNodeError>;

	/// Flush any in-flight record writer and seal `staging_dir` (§4.5 collect).
	async fn collect(&mut self, staging_dir: &Path) -> Result<(), RunNodeError> {
		let _ = staging_dir;
		return Ok(());
	}

	/// Invoke a user-registered named method (`REQUEST_METHOD`, §4.5).
	async fn method(
		&mut self,
		name: &str,
		params: serde_json::Value,
	) -> Result<serde_json::Value, RunNodeError> {
		let _ = params;
		return Err(RunNodeError::UnknownMethod { name: name.into() });
	}
}
