use smartstring::{LazyCompact, SmartString};
use std::{collections::BTreeMap, error::Error, fmt::Display};

use super::{Node, RunNodeError};

/// A node type's constructor: given its `NodeSpec::arguments`, build a
/// boxed, ready-to-run node, or fail with a `RunNodeError` (bad/missing
/// parameters).
///
/// Must be `Send + Sync`, since it is called from inside tokio's runtime.
type NodeInitFnType =
	&'static (dyn Fn(serde_json::Value) -> Result<Box<dyn Node>, RunNodeError> + Send + Sync);

/// An error encountered when registering a node type.
#[derive(Debug)]
pub enum RegisterNodeError {
	/// A node type with this class name is already registered.
	AlreadyExists,
}

impl Display for RegisterNodeError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::AlreadyExists => write!(f, "a node with this class name already exists"),
		}
	}
}

impl Error for RegisterNodeError {}

/// A factory that constructs node instances by class name.
pub struct NodeDispatcher {
	nodes: BTreeMap<SmartString<LazyCompact>, NodeInitFnType>,
}

impl NodeDispatcher {
	pub fn new() -> Self {
		return Self {
			nodes: BTreeMap::new(),
		};
	}

	/// Register a new node class. `class_name` must not already be registered.
	pub fn register_node(
		&mut self,
		class_name: &str,
		node_init: NodeInitFnType,
	) -> Result<(), RegisterNodeError> {
		if self.nodes.contains_key(class_name) {
			return Err(RegisterNodeError::AlreadyExists);
		}

		self.nodes.insert(class_name.into(), node_init);
		return Ok(());
	}

	pub fn has_node(&self, class_name: &str) -> bool {
		return self.nodes.contains_key(class_name);
	}

	/// Construct a node of the given class, passing it its construction arguments.
	pub fn init_node(
		&self,
		class_name: &str,
		arguments: serde_json::Value,
	) -> Option<Result<Box<dyn Node>, RunNodeError>> {
		self.nodes.get(class_name).map(|init| init(arguments))
	}
}

impl Default for NodeDispatcher {
	fn default() -> Self {
		Self::new()
	}
}
