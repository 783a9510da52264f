//! Manager-side bookkeeping of registered workers, the committed graph,
//! and the HTTP fan-out used to drive every worker through the shared
//! lifecycle (§4.3 WorkerHandler).

use chimera_protocol::{
	precondition_met, validate_placement, Command, GraphSpec, NodeId, NodePubTable, NodeState,
	Phase, Placement, PlacementError, WorkerId, WorkerRecord,
};
use chimera_transport::TransportError;
use std::{collections::BTreeMap, time::Duration};
use tokio::sync::Mutex;
use tracing::warn;

/// An error encountered servicing a manager HTTP/WS operation.
#[derive(Debug)]
pub enum WorkerHandlerError {
	/// `register_worker` saw the same id bound to a different address.
	Duplicate(WorkerId),
	UnregisteredWorker(WorkerId),
	NoActiveCommit,
	/// `commit` was called while a graph is already committed; `reset` first.
	AlreadyCommitted,
	/// A broadcast was refused because the graph's aggregate phase does not
	/// satisfy the command's precondition (§4.1, §4.3).
	InvalidPrecondition { command: Command, current: Phase },
	Placement(PlacementError),
	Transport(TransportError),
}

impl std::fmt::Display for WorkerHandlerError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Duplicate(id) => write!(f, "worker `{id}` is already registered at a different address"),
			Self::UnregisteredWorker(id) => write!(f, "worker `{id}` is not registered"),
			Self::NoActiveCommit => write!(f, "no graph has been committed"),
			Self::AlreadyCommitted => write!(f, "a graph is already committed; call `reset` first"),
			Self::InvalidPrecondition { command, current } => {
				write!(f, "cannot `{command}` while the graph's aggregate phase is {current}")
			}
			Self::Placement(e) => write!(f, "{e}"),
			Self::Transport(e) => write!(f, "{e}"),
		}
	}
}

impl std::error::Error for WorkerHandlerError {}

impl From<PlacementError> for WorkerHandlerError {
	fn from(value: PlacementError) -> Self {
		Self::Placement(value)
	}
}

impl From<TransportError> for WorkerHandlerError {
	fn from(value: TransportError) -> Self {
		Self::Transport(value)
	}
}

impl From<reqwest::Error> for WorkerHandlerError {
	fn from(value: reqwest::Error) -> Self {
		Self::Transport(TransportError::from(value))
	}
}

/// The graph and placement committed by the most recent successful `commit`.
struct Commit {
	graph: GraphSpec,
	placement: Placement,
}

pub struct WorkerHandlerConfig {
	pub staging_root: std::path::PathBuf,
	pub info_request_timeout: Duration,
}

/// Owns the worker registry, the active commit (if any), and the http
/// client used to reach every worker's `/nodes/*` surface.
pub struct WorkerHandler {
	config: WorkerHandlerConfig,
	http: reqwest::Client,
	workers: Mutex<BTreeMap<WorkerId, WorkerRecord>>,
	commit: Mutex<Option<Commit>>,
	/// Set for the duration of an in-flight `collect` (§8 S2): a second
	/// `collect` observes this and returns success without re-triggering
	/// any node-side work.
	collecting: Mutex<bool>,
}

impl WorkerHandler {
	pub fn new(config: WorkerHandlerConfig) -> Self {
		Self {
			config,
			http: reqwest::Client::new(),
			workers: Mutex::new(BTreeMap::new()),
			commit: Mutex::new(None),
			collecting: Mutex::new(false),
		}
	}

	pub fn staging_root(&self) -> &std::path::Path {
		&self.config.staging_root
	}

	/// A snapshot of every registered worker, for `GET /network`.
	pub async fn workers(&self) -> BTreeMap<WorkerId, WorkerRecord> {
		self.workers.lock().await.clone()
	}

	/// The pointwise minimum phase across every registered worker (§4.1
	/// aggregate state), or `None` if no worker has any node yet.
	pub async fn aggregate_phase(&self) -> Option<Phase> {
		self.workers
			.lock()
			.await
			.values()
			.filter_map(WorkerRecord::aggregate_phase)
			.min()
	}

	/// Register a worker's reachable address (§4.3). Idempotent when the
	/// same id is already registered at the same address.
	pub async fn register_worker(&self, worker_id: WorkerId, host: String, port: u16) -> Result<(), WorkerHandlerError> {
		let mut workers = self.workers.lock().await;
		match workers.get(&worker_id) {
			Some(existing) if existing.matches_address(&host, port) => return Ok(()),
			Some(_) => return Err(WorkerHandlerError::Duplicate(worker_id)),
			None => {
				workers.insert(worker_id.clone(), WorkerRecord::new(worker_id, host, port));
				return Ok(());
			}
		}
	}

	/// A worker's control connection closed unexpectedly (§8 S3): mark
	/// every node it hosts `ERROR` without forgetting the worker, so it
	/// still appears in `GET /network` and pins the aggregate phase.
	pub async fn mark_worker_unreachable(&self, worker_id: &WorkerId) {
		let mut workers = self.workers.lock().await;
		if let Some(record) = workers.get_mut(worker_id) {
			for node in record.nodes.values_mut() {
				node.apply_report(Phase::Error, None);
			}
		}
	}

	/// Deliberately remove a worker's record and forget every node bound
	/// to it (§4.3). Not reachable from any external route in this
	/// interface; kept as the operation that surface would call.
	pub async fn deregister_worker(&self, worker_id: &WorkerId) {
		self.workers.lock().await.remove(worker_id);
	}

	/// Validate and commit `graph`/`placement`, then create every node on
	/// its assigned worker and broadcast the resulting address table
	/// (§4.3 preconditions a/b/c). Rejected as `AlreadyCommitted` while a
	/// graph is already active; any step failure aborts the commit and
	/// rolls back via `reset` (§4.3, §9).
	pub async fn commit(&self, graph: GraphSpec, placement: Placement) -> Result<(), WorkerHandlerError> {
		if self.commit.lock().await.is_some() {
			return Err(WorkerHandlerError::AlreadyCommitted);
		}

		let registered: std::collections::BTreeSet<WorkerId> = self.workers.lock().await.keys().cloned().collect();
		validate_placement(&graph, &placement, &registered)?;

		let working_graph = graph.clone();
		let working_placement = placement.clone();
		*self.commit.lock().await = Some(Commit { graph, placement });

		if let Err(error) = self.create_and_connect(&working_graph, &working_placement).await {
			warn!(%error, "commit step failed, rolling back");
			if let Err(rollback_error) = self.reset().await {
				warn!(%rollback_error, "rollback after failed commit also failed");
			}
			return Err(error);
		}
		return Ok(());
	}

	/// Create every placed node on its worker and broadcast the resulting
	/// publisher table. Split out of `commit` so a failure partway through
	/// can be rolled back uniformly via `reset`.
	async fn create_and_connect(&self, graph: &GraphSpec, placement: &Placement) -> Result<(), WorkerHandlerError> {
		for worker_id in placement.worker_ids() {
			for node_id in placement.nodes_of(worker_id) {
				// `validate_placement` above already confirmed every placed node_id exists in `graph`.
				let spec = graph.node(node_id).unwrap();
				let state = self.create_node_on(worker_id, spec).await?;
				self.record_node_state(worker_id, state).await;
			}
		}

		let table = self.build_pub_table().await;
		for worker_id in placement.worker_ids() {
			self.send_server_data(worker_id, &table).await?;
		}
		return Ok(());
	}

	pub async fn start_workers(&self) -> Result<(), WorkerHandlerError> {
		self.fan_out(Command::Start, "/nodes/start").await
	}

	pub async fn record_workers(&self) -> Result<(), WorkerHandlerError> {
		self.fan_out(Command::Record, "/nodes/record").await
	}

	pub async fn stop_workers(&self) -> Result<(), WorkerHandlerError> {
		self.fan_out(Command::Stop, "/nodes/stop").await
	}

	/// Trigger collection on every worker; each worker zips and forwards
	/// its nodes' output to this manager's own `/file/post` (§4.6). A
	/// second call while a collection is already in flight returns
	/// success immediately without re-triggering any node-side work
	/// (§8 S2).
	pub async fn collect(&self) -> Result<(), WorkerHandlerError> {
		{
			let mut collecting = self.collecting.lock().await;
			if *collecting {
				return Ok(());
			}
			*collecting = true;
		}

		let result = self.fan_out(Command::Collect, "/nodes/save").await;
		*self.collecting.lock().await = false;
		return result;
	}

	/// Fan out `REQUEST_GATHER`-backed `/nodes/gather` and merge every
	/// worker's last-sample map.
	pub async fn gather(&self) -> Result<BTreeMap<NodeId, serde_json::Value>, WorkerHandlerError> {
		let commit = self.commit.lock().await;
		let Some(commit) = commit.as_ref() else {
			return Err(WorkerHandlerError::NoActiveCommit);
		};

		let mut merged = BTreeMap::new();
		for worker_id in commit.placement.worker_ids() {
			let node_ids: Vec<NodeId> = commit.placement.nodes_of(worker_id).cloned().collect();
			if node_ids.is_empty() {
				continue;
			}
			let record = self.record_of(worker_id).await?;
			let url = format!("http://{}:{}/nodes/gather", record.host, record.port);
			let body = serde_json::json!({ "node_ids": node_ids });
			let response = self
				.http
				.post(&url)
				.timeout(self.config.info_request_timeout)
				.json(&body)
				.send()
				.await?;
			let samples: BTreeMap<NodeId, serde_json::Value> = response.json().await?;
			merged.extend(samples);
		}
		return Ok(merged);
	}

	/// Destroy every committed node and return workers to `REGISTERED`
	/// (§4.3), discarding the active commit.
	pub async fn reset(&self) -> Result<(), WorkerHandlerError> {
		let mut commit = self.commit.lock().await;
		let Some(active) = commit.take() else {
			return Ok(());
		};

		for worker_id in active.placement.worker_ids() {
			let node_ids: Vec<NodeId> = active.placement.nodes_of(worker_id).cloned().collect();
			if node_ids.is_empty() {
				continue;
			}
			let Ok(record) = self.record_of(worker_id).await else {
				continue;
			};
			let url = format!("http://{}:{}/nodes/destroy", record.host, record.port);
			let body = serde_json::json!({ "node_ids": node_ids });
			if let Err(error) = self
				.http
				.post(&url)
				.timeout(self.config.info_request_timeout)
				.json(&body)
				.send()
				.await
			{
				warn!(%worker_id, %error, "destroy request failed during reset");
			}
		}

		let mut workers = self.workers.lock().await;
		for worker_id in active.placement.worker_ids() {
			if let Some(record) = workers.get_mut(worker_id) {
				record.nodes.clear();
			}
		}
		return Ok(());
	}

	async fn create_node_on(
		&self,
		worker_id: &WorkerId,
		spec: &chimera_protocol::NodeSpec,
	) -> Result<NodeState, WorkerHandlerError> {
		let record = self.record_of(worker_id).await?;
		let url = format!("http://{}:{}/nodes/create", record.host, record.port);
		let response = self
			.http
			.post(&url)
			.timeout(self.config.info_request_timeout)
			.json(spec)
			.send()
			.await?;
		let state: NodeState = response.json().await?;
		return Ok(state);
	}

	async fn send_server_data(&self, worker_id: &WorkerId, table: &NodePubTable) -> Result<(), WorkerHandlerError> {
		let record = self.record_of(worker_id).await?;
		let url = format!("http://{}:{}/nodes/server_data", record.host, record.port);
		self.http
			.post(&url)
			.timeout(self.config.info_request_timeout)
			.json(table)
			.send()
			.await?;
		return Ok(());
	}

	/// POST `path` with `{node_ids}` to every worker holding at least one
	/// committed node, merging each worker's returned per-node state back
	/// into the registry (§4.1: the manager mirrors worker-authoritative phase).
	///
	/// Refuses outright, before contacting any worker, when the graph's
	/// aggregate phase does not satisfy `command`'s precondition — so a
	/// rejected broadcast never transitions a subset of nodes (§4.3, §8
	/// invariant 4).
	async fn fan_out(&self, command: Command, path: &str) -> Result<(), WorkerHandlerError> {
		let placement = {
			let commit = self.commit.lock().await;
			let Some(commit) = commit.as_ref() else {
				return Err(WorkerHandlerError::NoActiveCommit);
			};
			commit.placement.clone()
		};

		let current = self.aggregate_phase().await.unwrap_or(Phase::Registered);
		if !precondition_met(command, current) {
			return Err(WorkerHandlerError::InvalidPrecondition { command, current });
		}

		for worker_id in placement.worker_ids() {
			let node_ids: Vec<NodeId> = placement.nodes_of(worker_id).cloned().collect();
			if node_ids.is_empty() {
				continue;
			}
			let record = self.record_of(worker_id).await?;
			let url = format!("http://{}:{}{path}", record.host, record.port);
			let body = serde_json::json!({ "node_ids": node_ids });
			let response = self
				.http
				.post(&url)
				.timeout(self.config.info_request_timeout)
				.json(&body)
				.send()
				.await?;
			let states: BTreeMap<NodeId, NodeState> = response.json().await?;
			let mut workers = self.workers.lock().await;
			if let Some(record) = workers.get_mut(worker_id) {
				record.nodes.extend(states);
			}
		}
		return Ok(());
	}

	async fn record_of(&self, worker_id: &WorkerId) -> Result<WorkerRecord, WorkerHandlerError> {
		self.workers
			.lock()
			.await
			.get(worker_id)
			.cloned()
			.ok_or_else(|| WorkerHandlerError::UnregisteredWorker(worker_id.clone()))
	}

	async fn record_node_state(&self, worker_id: &WorkerId, state: NodeState) {
		let mut workers = self.workers.lock().await;
		if let Some(record) = workers.get_mut(worker_id) {
			record.nodes.insert(state.node_id.clone(), state);
		}
	}

	async fn build_pub_table(&self) -> NodePubTable {
		let workers = self.workers.lock().await;
		let mut table = NodePubTable::new();
		for record in workers.values() {
			for (node_id, state) in &record.nodes {
				if let Some(address) = state.pub_address.clone() {
					table.insert(node_id.clone(), address);
				}
			}
		}
		return table;
	}
}

/// Decode a `CLIENT_REGISTER` frame's `client_id`/`host`/`port` fields.
pub fn parse_worker_register(envelope: &chimera_protocol::MessageEnvelope) -> Option<(WorkerId, String, u16)> {
	let client_id = envelope.data.get("client_id")?.as_str()?.to_owned();
	let host = envelope.data.get("host")?.as_str()?.to_owned();
	let port = envelope.data.get("port")?.as_u64()? as u16;
	return Some((WorkerId::new(&client_id), host, port));
}

#[cfg(test)]
mod tests {
	use super::*;
	use chimera_protocol::{MessageEnvelope, Signal};

	fn handler() -> WorkerHandler {
		WorkerHandler::new(WorkerHandlerConfig {
			staging_root: std::env::temp_dir(),
			info_request_timeout: Duration::from_secs(1),
		})
	}

	#[tokio::test]
	async fn register_is_idempotent_at_the_same_address() {
		let handler = handler();
		let id = WorkerId::new("W1");
		handler.register_worker(id.clone(), "127.0.0.1".into(), 9000).await.unwrap();
		handler.register_worker(id.clone(), "127.0.0.1".into(), 9000).await.unwrap();
		assert_eq!(handler.workers().await.len(), 1);
	}

	#[tokio::test]
	async fn register_rejects_a_conflicting_address() {
		let handler = handler();
		let id = WorkerId::new("W1");
		handler.register_worker(id.clone(), "127.0.0.1".into(), 9000).await.unwrap();
		let result = handler.register_worker(id, "127.0.0.1".into(), 9001).await;
		assert!(matches!(result, Err(WorkerHandlerError::Duplicate(_))));
	}

	#[tokio::test]
	async fn unreachable_worker_keeps_its_record_but_errors_its_nodes() {
		let handler = handler();
		let id = WorkerId::new("W1");
		handler.register_worker(id.clone(), "127.0.0.1".into(), 9000).await.unwrap();
		handler.record_node_state(&id, {
			let mut state = NodeState::new(NodeId::new("A"));
			state.apply_report(Phase::Previewing, None);
			state
		}).await;

		handler.mark_worker_unreachable(&id).await;

		let workers = handler.workers().await;
		let record = workers.get(&id).unwrap();
		assert_eq!(record.aggregate_phase(), Some(Phase::Error));
	}

	#[tokio::test]
	async fn deregister_forgets_the_worker_entirely() {
		let handler = handler();
		let id = WorkerId::new("W1");
		handler.register_worker(id.clone(), "127.0.0.1".into(), 9000).await.unwrap();
		handler.deregister_worker(&id).await;
		assert!(handler.workers().await.is_empty());
	}

	#[tokio::test]
	async fn aggregate_phase_ignores_workers_with_no_nodes() {
		let handler = handler();
		handler.register_worker(WorkerId::new("W1"), "127.0.0.1".into(), 9000).await.unwrap();
		assert_eq!(handler.aggregate_phase().await, None);
	}

	#[test]
	fn parses_a_client_register_frame() {
		let envelope = MessageEnvelope::new(
			Signal::ClientRegister,
			serde_json::json!({ "client_id": "W1", "host": "10.0.0.1", "port": 9100 }),
		);
		let (id, host, port) = parse_worker_register(&envelope).unwrap();
		assert_eq!(id, WorkerId::new("W1"));
		assert_eq!(host, "10.0.0.1");
		assert_eq!(port, 9100);
	}

	#[test]
	fn rejects_a_frame_missing_port() {
		let envelope = MessageEnvelope::new(
			Signal::ClientRegister,
			serde_json::json!({ "client_id": "W1", "host": "10.0.0.1" }),
		);
		assert!(parse_worker_register(&envelope).is_none());
	}

	#[tokio::test]
	async fn commit_is_rejected_while_one_is_already_active() {
		let handler = handler();
		*handler.commit.lock().await = Some(Commit {
			graph: GraphSpec::new(Vec::new()).unwrap(),
			placement: Placement::new(BTreeMap::new()),
		});

		let result = handler.commit(GraphSpec::new(Vec::new()).unwrap(), Placement::new(BTreeMap::new())).await;
		assert!(matches!(result, Err(WorkerHandlerError::AlreadyCommitted)));
	}

	#[tokio::test]
	async fn fan_out_refuses_a_command_the_aggregate_phase_does_not_permit() {
		let handler = handler();
		// An active commit with no placed nodes: aggregate_phase() is `None`,
		// so the gate falls back to `Registered`, which fails `Start`'s precondition.
		*handler.commit.lock().await = Some(Commit {
			graph: GraphSpec::new(Vec::new()).unwrap(),
			placement: Placement::new(BTreeMap::new()),
		});

		let result = handler.start_workers().await;
		assert!(matches!(
			result,
			Err(WorkerHandlerError::InvalidPrecondition { command: Command::Start, current: Phase::Registered })
		));
	}

	#[tokio::test]
	async fn a_second_collect_while_one_is_in_flight_short_circuits() {
		let handler = handler();
		*handler.collecting.lock().await = true;
		assert!(handler.collect().await.is_ok());
		// The guard must still be cleared by the in-flight caller, not this short-circuit.
		assert!(*handler.collecting.lock().await);
	}
}
