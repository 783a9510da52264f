//! Manager-side bookkeeping of registered workers and the address table
//! built after every node is initialized.

use crate::{NodeId, Phase, WorkerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use utoipa::ToSchema;

/// A node's address and lifecycle phase, as last reported by its worker.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NodeState {
	pub node_id: NodeId,
	pub phase: Phase,
	/// Unset until the node reaches `Initialized` and binds its publisher socket.
	pub pub_address: Option<(String, u16)>,
	#[serde(with = "time::serde::rfc3339")]
	pub last_seen_at: OffsetDateTime,
}

impl NodeState {
	pub fn new(node_id: NodeId) -> Self {
		Self {
			node_id,
			phase: Phase::Registered,
			pub_address: None,
			last_seen_at: OffsetDateTime::now_utc(),
		}
	}

	/// Apply a freshly reported phase, discarding it as stale if it moves
	/// backward in the lifecycle sequence (§5 ordering guarantee). `Error`
	/// and an explicit reset to `Registered` always apply: `Error` ranks
	/// lowest only for the purposes of aggregation, not as a "backward"
	/// lifecycle move.
	pub fn apply_report(&mut self, phase: Phase, pub_address: Option<(String, u16)>) {
		let is_forward = phase != Phase::Error && phase >= self.phase;
		if phase == Phase::Registered || phase == Phase::Error || is_forward {
			self.phase = phase;
		}
		if pub_address.is_some() {
			self.pub_address = pub_address;
		}
		self.last_seen_at = OffsetDateTime::now_utc();
	}
}

/// A registered worker: its address and the state of every node it hosts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkerRecord {
	pub worker_id: WorkerId,
	pub host: String,
	pub port: u16,
	pub nodes: BTreeMap<NodeId, NodeState>,
	#[serde(with = "time::serde::rfc3339")]
	pub registered_at: OffsetDateTime,
}

impl WorkerRecord {
	pub fn new(worker_id: WorkerId, host: String, port: u16) -> Self {
		Self {
			worker_id,
			host,
			port,
			nodes: BTreeMap::new(),
			registered_at: OffsetDateTime::now_utc(),
		}
	}

	pub fn matches_address(&self, host: &str, port: u16) -> bool {
		self.host == host && self.port == port
	}

	/// The pointwise minimum phase across every node this worker hosts.
	pub fn aggregate_phase(&self) -> Option<Phase> {
		self.nodes.values().map(|n| n.phase).min()
	}
}

/// `node_id -> (host, port)` for every node in the committed graph, built
/// only once every node_id has reached `Initialized` (§3 invariant).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NodePubTable(BTreeMap<NodeId, (String, u16)>);

impl NodePubTable {
	pub fn new() -> Self {
		Self(BTreeMap::new())
	}

	pub fn insert(&mut self, node_id: NodeId, address: (String, u16)) {
		self.0.insert(node_id, address);
	}

	pub fn get(&self, node_id: &NodeId) -> Option<&(String, u16)> {
		self.0.get(node_id)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &(String, u16))> {
		self.0.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stale_report_is_discarded() {
		let mut state = NodeState::new(NodeId::new("Gen1"));
		state.apply_report(Phase::Connected, None);
		assert_eq!(state.phase, Phase::Connected);

		// A late-arriving `Initialized` report must not move us backward.
		state.apply_report(Phase::Initialized, None);
		assert_eq!(state.phase, Phase::Connected);
	}

	#[test]
	fn explicit_reset_moves_backward() {
		let mut state = NodeState::new(NodeId::new("Gen1"));
		state.apply_report(Phase::Recording, None);
		state.apply_report(Phase::Registered, None);
		assert_eq!(state.phase, Phase::Registered);
	}

	#[test]
	fn worker_aggregate_is_minimum_across_its_nodes() {
		let mut record = WorkerRecord::new(WorkerId::new("W1"), "127.0.0.1".into(), 9000);
		let mut a = NodeState::new(NodeId::new("A"));
		a.apply_report(Phase::Previewing, None);
		let mut b = NodeState::new(NodeId::new("B"));
		b.apply_report(Phase::Error, None);
		record.nodes.insert(NodeId::new("A"), a);
		record.nodes.insert(NodeId::new("B"), b);
		assert_eq!(record.aggregate_phase(), Some(Phase::Error));
	}
}
