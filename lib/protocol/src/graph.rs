//! The committed computation graph: nodes, edges, and the execution
//! context each node runs under.

use crate::NodeId;
use chimera_util::graph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use utoipa::ToSchema;

/// Where a node's `step` actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ExecutionContext {
	/// CPU-bound or library-unsafe nodes: a dedicated OS process.
	IsolatedProcess,
	/// Light I/O nodes: a thread shared with the worker's node pool.
	SharedThread,
}

/// One node in a committed graph: identity, construction arguments, and
/// the node_ids it subscribes to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NodeSpec {
	pub node_id: NodeId,
	pub class_name: String,
	#[serde(default)]
	pub arguments: serde_json::Map<String, serde_json::Value>,
	pub context: ExecutionContext,
	#[serde(default)]
	pub inputs: BTreeSet<NodeId>,
}

/// An immutable, acyclic plan of nodes and sample edges.
///
/// Constructed via [`GraphSpec::new`], which is the only place the
/// acyclicity invariant (§3) is checked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GraphSpec {
	nodes: BTreeMap<NodeId, NodeSpec>,
	edges: BTreeSet<(NodeId, NodeId)>,
}

/// `GraphSpec::new` rejected the proposed graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
	#[error("graph contains a cycle")]
	Cycle,

	#[error("edge references unknown node `{0}`")]
	UnknownEdgeEndpoint(NodeId),

	#[error("duplicate node id `{0}`")]
	DuplicateNodeId(NodeId),
}

impl GraphSpec {
	/// Build a graph from its nodes, deriving edges from each node's
	/// declared `inputs` (an edge `src -> dst` exists whenever `dst`
	/// lists `src` as an input).
	pub fn new(nodes: Vec<NodeSpec>) -> Result<Self, GraphError> {
		let mut by_id = BTreeMap::new();
		for node in nodes {
			if by_id.insert(node.node_id.clone(), node).is_some() {
				return Err(GraphError::DuplicateNodeId(
					by_id.into_keys().next_back().unwrap(),
				));
			}
		}

		let mut edges = BTreeSet::new();
		for node in by_id.values() {
			for input in &node.inputs {
				if !by_id.contains_key(input) {
					return Err(GraphError::UnknownEdgeEndpoint(input.clone()));
				}
				edges.insert((input.clone(), node.node_id.clone()));
			}
		}

		let spec = Self {
			nodes: by_id,
			edges,
		};

		if spec.has_cycle() {
			return Err(GraphError::Cycle);
		}

		return Ok(spec);
	}

	fn has_cycle(&self) -> bool {
		let mut graph = Graph::<&NodeId, ()>::new();
		let mut idx_of = BTreeMap::new();
		for id in self.nodes.keys() {
			idx_of.insert(id, graph.add_node(id));
		}
		for (src, dst) in &self.edges {
			graph.add_edge(idx_of[src], idx_of[dst], ());
		}
		return graph.has_cycle();
	}

	pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
		self.nodes.keys()
	}

	pub fn node(&self, id: &NodeId) -> Option<&NodeSpec> {
		self.nodes.get(id)
	}

	pub fn edges(&self) -> impl Iterator<Item = &(NodeId, NodeId)> {
		self.edges.iter()
	}

	/// All node_ids with an edge `other -> node_id` — i.e. `node_id`'s declared inputs.
	pub fn inputs_of(&self, node_id: &NodeId) -> impl Iterator<Item = &NodeId> {
		self.edges
			.iter()
			.filter(move |(_, dst)| dst == node_id)
			.map(|(src, _)| src)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn spec(id: &str, inputs: &[&str]) -> NodeSpec {
		NodeSpec {
			node_id: NodeId::new(id),
			class_name: "Test".into(),
			arguments: serde_json::Map::new(),
			context: ExecutionContext::SharedThread,
			inputs: inputs.iter().map(|s| NodeId::new(s)).collect(),
		}
	}

	#[test]
	fn chain_is_acyclic() {
		let graph = GraphSpec::new(vec![spec("Gen1", &[]), spec("Con1", &["Gen1"])]).unwrap();
		assert_eq!(graph.len(), 2);
		assert!(graph
			.edges()
			.any(|(a, b)| a == &NodeId::new("Gen1") && b == &NodeId::new("Con1")));
	}

	#[test]
	fn self_loop_is_rejected() {
		let err = GraphSpec::new(vec![spec("A", &["A"])]).unwrap_err();
		assert!(matches!(err, GraphError::Cycle));
	}

	#[test]
	fn two_cycle_is_rejected() {
		let err = GraphSpec::new(vec![spec("A", &["B"]), spec("B", &["A"])]).unwrap_err();
		assert!(matches!(err, GraphError::Cycle));
	}

	#[test]
	fn edge_to_unknown_node_is_rejected() {
		let err = GraphSpec::new(vec![spec("A", &["Ghost"])]).unwrap_err();
		assert!(matches!(err, GraphError::UnknownEdgeEndpoint(_)));
	}
}
