//! Worker-side bookkeeping of hosted nodes and the signal fan-out used to
//! drive them (§4.4 NodeHandler).

use chimera_node_kit::{
	base::{Node, NodeDispatcher},
	runtime::{NodeRuntime, NodeRuntimeConfig},
};
use chimera_protocol::{MessageEnvelope, NodeId, NodePubTable, NodeSpec, NodeState, Phase, Signal};
use chimera_transport::{PeerRegistry, TransportError};
use std::{collections::BTreeMap, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// An error encountered servicing a worker HTTP/WS operation.
#[derive(Debug)]
pub enum NodeHandlerError {
	UnknownNodeClass(String),
	UnknownNode(NodeId),
	Transport(TransportError),
}

impl std::fmt::Display for NodeHandlerError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::UnknownNodeClass(name) => write!(f, "unknown node class `{name}`"),
			Self::UnknownNode(id) => write!(f, "unknown node `{id}`"),
			Self::Transport(e) => write!(f, "{e}"),
		}
	}
}

impl std::error::Error for NodeHandlerError {}

impl From<TransportError> for NodeHandlerError {
	fn from(value: TransportError) -> Self {
		Self::Transport(value)
	}
}

pub struct WorkerNodeConfig {
	pub bind_host: String,
	pub self_host: String,
	pub self_port: u16,
	pub staging_root: PathBuf,
	pub archiver_bin: PathBuf,
	pub ack_timeout: Duration,
	pub zip_budget: Duration,
	/// This worker's own `/file/post` URL, where hosted nodes upload their
	/// collected artifacts.
	pub self_file_post_url: String,

	/// The manager's `/file/post` URL, used once this worker re-uploads a
	/// collected artifact on the manager's behalf (§4.4 `receive_artifact`).
	pub manager_file_post_url: String,
}

/// Owns the dispatcher used to construct node instances, the signal
/// channels to every currently-hosted node, and each node's last-reported
/// state.
pub struct NodeHandler {
	dispatcher: NodeDispatcher,
	config: WorkerNodeConfig,
	peers: PeerRegistry,
	nodes: Mutex<BTreeMap<NodeId, NodeState>>,
}

impl NodeHandler {
	pub fn new(dispatcher: NodeDispatcher, config: WorkerNodeConfig) -> Self {
		Self {
			dispatcher,
			config,
			peers: PeerRegistry::new(),
			nodes: Mutex::new(BTreeMap::new()),
		}
	}

	pub fn peers(&self) -> &PeerRegistry {
		&self.peers
	}

	/// Snapshot of every hosted node's last-reported state.
	pub async fn nodes(&self) -> BTreeMap<NodeId, NodeState> {
		self.nodes.lock().await.clone()
	}

	/// Instantiate `spec` and spin up its control loop. Blocks until the
	/// node reports `INITIALIZED` with its publisher address (§4.4).
	pub async fn create_node(&self, spec: &NodeSpec) -> Result<NodeState, NodeHandlerError> {
		let node: Box<dyn Node> = self
			.dispatcher
			.init_node(&spec.class_name, serde_json::Value::Object(spec.arguments.clone()))
			.ok_or_else(|| NodeHandlerError::UnknownNodeClass(spec.class_name.clone()))?
			.map_err(|error| NodeHandlerError::Transport(TransportError::Other(Arc::new(error))))?;

		self.nodes
			.lock()
			.await
			.insert(spec.node_id.clone(), NodeState::new(spec.node_id.clone()));

		let runtime_config = NodeRuntimeConfig {
			node_id: spec.node_id.clone(),
			worker_host: self.config.self_host.clone(),
			worker_port: self.config.self_port,
			bind_host: self.config.bind_host.clone(),
			inputs: spec.inputs.clone(),
			ack_timeout: self.config.ack_timeout,
			zip_budget: self.config.zip_budget,
			staging_dir: self.config.staging_root.join(spec.node_id.to_string()),
			archiver_bin: self.config.archiver_bin.clone(),
			worker_file_post_url: self.config.self_file_post_url.clone(),
		};

		let node_id = spec.node_id.clone();
		tokio::spawn(async move {
			let runtime = match NodeRuntime::start(runtime_config, node).await {
				Ok(runtime) => runtime,
				Err(error) => {
					warn!(%node_id, %error, "node failed to start");
					return;
				}
			};
			runtime.run().await;
			info!(%node_id, "node control loop exited");
		});

		return self.await_phase(&spec.node_id, Phase::Initialized).await;
	}

	/// Wait (briefly) for a node to report the given phase, returning its
	/// current state regardless once the ack-equivalent timeout elapses.
	async fn await_phase(&self, node_id: &NodeId, target: Phase) -> Result<NodeState, NodeHandlerError> {
		let deadline = tokio::time::Instant::now() + self.config.ack_timeout;
		loop {
			if let Some(state) = self.nodes.lock().await.get(node_id).cloned() {
				if state.phase >= target || state.phase == Phase::Error {
					return Ok(state);
				}
			}
			if tokio::time::Instant::now() >= deadline {
				return Err(NodeHandlerError::Transport(TransportError::Timeout));
			}
			tokio::time::sleep(Duration::from_millis(25)).await;
		}
	}

	/// Record a freshly received `NODE_STATUS` report (§5 monotonic ordering).
	pub async fn apply_report(&self, node_id: NodeId, phase: Phase, pub_address: Option<(String, u16)>) {
		let mut nodes = self.nodes.lock().await;
		let entry = nodes.entry(node_id.clone()).or_insert_with(|| NodeState::new(node_id));
		entry.apply_report(phase, pub_address);
	}

	/// Forward the committed publisher table to every hosted node (§4.4).
	pub async fn setup_connections(&self, table: &NodePubTable) -> Result<(), NodeHandlerError> {
		let data = serde_json::to_value(table).unwrap();
		self.broadcast(Signal::BroadcastNodeServer, data, None).await
	}

	pub async fn start_nodes(&self, node_ids: &[NodeId]) -> Result<BTreeMap<NodeId, NodeState>, NodeHandlerError> {
		self.broadcast(Signal::StartNodes, serde_json::json!({}), Some(node_ids)).await?;
		return Ok(self.states_of(node_ids).await);
	}

	pub async fn record_nodes(&self, node_ids: &[NodeId]) -> Result<BTreeMap<NodeId, NodeState>, NodeHandlerError> {
		self.broadcast(Signal::RecordNodes, serde_json::json!({}), Some(node_ids)).await?;
		return Ok(self.states_of(node_ids).await);
	}

	pub async fn stop_nodes(&self, node_ids: &[NodeId]) -> Result<BTreeMap<NodeId, NodeState>, NodeHandlerError> {
		self.broadcast(Signal::StopNodes, serde_json::json!({}), Some(node_ids)).await?;
		return Ok(self.states_of(node_ids).await);
	}

	pub async fn collect_nodes(&self, node_ids: &[NodeId]) -> Result<BTreeMap<NodeId, NodeState>, NodeHandlerError> {
		self.broadcast(Signal::RequestCollect, serde_json::json!({}), Some(node_ids)).await?;
		return Ok(self.states_of(node_ids).await);
	}

	/// Snapshot the last-reported state of exactly the given nodes.
	async fn states_of(&self, node_ids: &[NodeId]) -> BTreeMap<NodeId, NodeState> {
		let nodes = self.nodes.lock().await;
		return node_ids
			.iter()
			.filter_map(|id| nodes.get(id).map(|state| (id.clone(), state.clone())))
			.collect();
	}

	/// Re-upload every already-staged node artifact to the manager, on the
	/// manager's behalf (§4.4 `receive_artifact`, §4.6). Archives are keyed
	/// by node id, not worker id, so the manager stages them under
	/// `<logdir>/<node_id>/...` (§4.6 layout).
	pub async fn forward_to_manager(&self, node_ids: &[NodeId]) -> Result<(), NodeHandlerError> {
		let client = reqwest::Client::new();
		for node_id in node_ids {
			let archive_path = self
				.config
				.staging_root
				.join(node_id.to_string())
				.join(format!("{node_id}.zip"));
			chimera_transport::post_archive(&client, &self.config.manager_file_post_url, &node_id.to_string(), &archive_path)
				.await?;
		}
		return Ok(());
	}

	/// Fan out `REQUEST_GATHER` and return each node's last sample.
	pub async fn gather_nodes(
		&self,
		node_ids: &[NodeId],
	) -> Result<BTreeMap<NodeId, serde_json::Value>, NodeHandlerError> {
		let mut results = BTreeMap::new();
		for node_id in node_ids {
			let channel = self
				.peers
				.get(&node_id.to_string())
				.await
				.ok_or_else(|| NodeHandlerError::UnknownNode(node_id.clone()))?;
			let result = channel.send_with_ack(Signal::RequestGather, serde_json::json!({})).await?;
			results.insert(node_id.clone(), result);
		}
		return Ok(results);
	}

	pub async fn request_method(
		&self,
		node_id: &NodeId,
		name: &str,
		params: serde_json::Value,
	) -> Result<serde_json::Value, NodeHandlerError> {
		let channel = self
			.peers
			.get(&node_id.to_string())
			.await
			.ok_or_else(|| NodeHandlerError::UnknownNode(node_id.clone()))?;
		let data = serde_json::json!({ "name": name, "params": params });
		return Ok(channel.send_with_ack(Signal::RequestMethod, data).await?);
	}

	/// Send `signal` to every targeted node (or every hosted node, when
	/// `node_ids` is `None`) and wait for every ack (§4.3 broadcast semantics).
	async fn broadcast(
		&self,
		signal: Signal,
		data: serde_json::Value,
		node_ids: Option<&[NodeId]>,
	) -> Result<(), NodeHandlerError> {
		let targets: Vec<NodeId> = match node_ids {
			Some(ids) => ids.to_vec(),
			None => self.nodes.lock().await.keys().cloned().collect(),
		};

		for node_id in &targets {
			let channel = self
				.peers
				.get(&node_id.to_string())
				.await
				.ok_or_else(|| NodeHandlerError::UnknownNode(node_id.clone()))?;
			channel.send_with_ack(signal, data.clone()).await?;
		}
		return Ok(());
	}
}

/// Decode a `NODE_STATUS` frame's `phase`/`pub_address` fields.
pub fn parse_node_status(envelope: &MessageEnvelope) -> Option<(Phase, Option<(String, u16)>)> {
	let phase: Phase = serde_json::from_value(envelope.data.get("phase")?.clone()).ok()?;
	let pub_address = envelope
		.data
		.get("pub_address")
		.and_then(|v| serde_json::from_value::<(String, u16)>(v.clone()).ok());
	return Some((phase, pub_address));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_a_status_frame_with_pub_address() {
		let envelope = MessageEnvelope::new(
			Signal::NodeStatus,
			serde_json::json!({ "phase": "Connected", "pub_address": ["10.0.0.1", 9200] }),
		);
		let (phase, pub_address) = parse_node_status(&envelope).unwrap();
		assert_eq!(phase, Phase::Connected);
		assert_eq!(pub_address, Some(("10.0.0.1".to_string(), 9200)));
	}

	#[test]
	fn parses_a_status_frame_with_no_pub_address() {
		let envelope = MessageEnvelope::new(Signal::NodeStatus, serde_json::json!({ "phase": "Registered" }));
		let (phase, pub_address) = parse_node_status(&envelope).unwrap();
		assert_eq!(phase, Phase::Registered);
		assert_eq!(pub_address, None);
	}

	#[test]
	fn rejects_a_frame_missing_phase() {
		let envelope = MessageEnvelope::new(Signal::NodeStatus, serde_json::json!({}));
		assert!(parse_node_status(&envelope).is_none());
	}
}
