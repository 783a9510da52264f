//! The mapping of committed nodes onto the workers that host them.

use crate::{GraphSpec, NodeId, WorkerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use utoipa::ToSchema;

/// worker_id -> the set of node_ids it is asked to host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Placement(BTreeMap<WorkerId, BTreeSet<NodeId>>);

impl Placement {
	pub fn new(map: BTreeMap<WorkerId, BTreeSet<NodeId>>) -> Self {
		Self(map)
	}

	pub fn worker_of(&self, node_id: &NodeId) -> Option<&WorkerId> {
		self.0
			.iter()
			.find(|(_, nodes)| nodes.contains(node_id))
			.map(|(worker, _)| worker)
	}

	pub fn nodes_of(&self, worker_id: &WorkerId) -> impl Iterator<Item = &NodeId> {
		self.0
			.get(worker_id)
			.into_iter()
			.flat_map(|nodes| nodes.iter())
	}

	pub fn worker_ids(&self) -> impl Iterator<Item = &WorkerId> {
		self.0.keys()
	}
}

/// `commit`'s placement precondition was violated: §4.3 (a)/(b)/(c).
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
	#[error("node `{0}` is not assigned to any worker")]
	NodeUnplaced(NodeId),

	#[error("node `{0}` is assigned to more than one worker")]
	NodeDoublePlaced(NodeId),

	#[error("placement references unregistered worker `{0}`")]
	UnregisteredWorker(WorkerId),

	#[error("graph rejected: {0}")]
	InvalidGraph(#[from] crate::GraphError),
}

/// Validate a placement against a graph and the set of currently
/// registered workers. Every node must appear in exactly one worker's
/// set, and every referenced worker must be registered.
pub fn validate_placement(
	graph: &GraphSpec,
	placement: &Placement,
	registered_workers: &BTreeSet<WorkerId>,
) -> Result<(), PlacementError> {
	for worker_id in placement.worker_ids() {
		if !registered_workers.contains(worker_id) {
			return Err(PlacementError::UnregisteredWorker(worker_id.clone()));
		}
	}

	let mut seen: BTreeMap<&NodeId, usize> = BTreeMap::new();
	for worker_id in placement.worker_ids() {
		for node_id in placement.nodes_of(worker_id) {
			*seen.entry(node_id).or_insert(0) += 1;
		}
	}

	for node_id in graph.node_ids() {
		match seen.get(node_id).copied().unwrap_or(0) {
			0 => return Err(PlacementError::NodeUnplaced(node_id.clone())),
			1 => {}
			_ => return Err(PlacementError::NodeDoublePlaced(node_id.clone())),
		}
	}

	return Ok(());
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ExecutionContext, NodeSpec};

	fn graph() -> GraphSpec {
		GraphSpec::new(vec![
			NodeSpec {
				node_id: NodeId::new("Gen1"),
				class_name: "Test".into(),
				arguments: serde_json::Map::new(),
				context: ExecutionContext::SharedThread,
				inputs: BTreeSet::new(),
			},
			NodeSpec {
				node_id: NodeId::new("Con1"),
				class_name: "Test".into(),
				arguments: serde_json::Map::new(),
				context: ExecutionContext::SharedThread,
				inputs: [NodeId::new("Gen1")].into_iter().collect(),
			},
		])
		.unwrap()
	}

	#[test]
	fn single_worker_placement_is_valid() {
		let placement = Placement::new(BTreeMap::from([(
			WorkerId::new("W1"),
			[NodeId::new("Gen1"), NodeId::new("Con1")]
				.into_iter()
				.collect(),
		)]));
		let workers = [WorkerId::new("W1")].into_iter().collect();
		validate_placement(&graph(), &placement, &workers).unwrap();
	}

	#[test]
	fn unplaced_node_is_rejected() {
		let placement = Placement::new(BTreeMap::from([(
			WorkerId::new("W1"),
			[NodeId::new("Gen1")].into_iter().collect(),
		)]));
		let workers = [WorkerId::new("W1")].into_iter().collect();
		let err = validate_placement(&graph(), &placement, &workers).unwrap_err();
		assert!(matches!(err, PlacementError::NodeUnplaced(_)));
	}

	#[test]
	fn unregistered_worker_is_rejected() {
		let placement = Placement::new(BTreeMap::from([(
			WorkerId::new("Ghost"),
			[NodeId::new("Gen1"), NodeId::new("Con1")]
				.into_iter()
				.collect(),
		)]));
		let workers = [WorkerId::new("W1")].into_iter().collect();
		let err = validate_placement(&graph(), &placement, &workers).unwrap_err();
		assert!(matches!(err, PlacementError::UnregisteredWorker(_)));
	}
}
