//! Protocol-level errors: lifecycle and graph rejections. These are a
//! closed, homogeneous variant set, so — unlike the transport crate's
//! error type — they are derived with `thiserror` rather than hand-rolled.

use crate::{Command, GraphError, NodeId, Phase, PlacementError};
use thiserror::Error;

/// §7 error kinds owned by this crate.
#[derive(Debug, Error)]
pub enum ProtocolError {
	/// A command was rejected because the target's lifecycle phase forbids it.
	#[error("cannot apply `{command}` to node `{node_id}` in state {current}")]
	InvalidPrecondition {
		node_id: NodeId,
		command: Command,
		current: Phase,
	},

	#[error(transparent)]
	Placement(#[from] PlacementError),

	#[error(transparent)]
	Graph(#[from] GraphError),
}
