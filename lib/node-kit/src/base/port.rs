//! Port names: how a node's declared inputs map onto the producer
//! node_ids that feed them.

use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use std::fmt::Display;

#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize, PartialOrd, Ord)]
pub struct PortName(SmartString<LazyCompact>);

impl PortName {
	pub fn new(id: &str) -> Self {
		Self(id.into())
	}

	pub fn id(&self) -> &SmartString<LazyCompact> {
		&self.0
	}
}

impl Display for PortName {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.0.fmt(f)
	}
}

impl From<String> for PortName {
	fn from(value: String) -> Self {
		Self::new(&value)
	}
}

impl From<&str> for PortName {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
