//! Stable string identifiers used across the control plane

use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::fmt::Display;

/// The stable id of a node, assigned when its [`crate::NodeSpec`] is authored.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(SmartString<LazyCompact>);

impl NodeId {
	pub fn new(id: &str) -> Self {
		Self(id.into())
	}

	pub fn id(&self) -> &SmartString<LazyCompact> {
		&self.0
	}
}

impl Display for NodeId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.0.fmt(f)
	}
}

impl From<String> for NodeId {
	fn from(value: String) -> Self {
		Self::new(&value)
	}
}

impl From<&str> for NodeId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

/// The stable id of a worker, assigned when it registers with the manager.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize, PartialOrd, Ord)]
pub struct WorkerId(SmartString<LazyCompact>);

impl WorkerId {
	pub fn new(id: &str) -> Self {
		Self(id.into())
	}

	pub fn id(&self) -> &SmartString<LazyCompact> {
		&self.0
	}
}

impl Display for WorkerId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.0.fmt(f)
	}
}

impl From<String> for WorkerId {
	fn from(value: String) -> Self {
		Self::new(&value)
	}
}

impl From<&str> for WorkerId {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
