//! The lifecycle state machine shared by nodes, workers and the manager.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use utoipa::ToSchema;

/// A single participant's position in the shared lifecycle.
///
/// Variant order matters: `Phase`'s [`Ord`] implementation reflects the
/// sequence `Registered..Shutdown`, with `Error` ranking below every other
/// phase so that [`Phase::min`] over a set of nodes naturally collapses to
/// `Error` as soon as any one of them fails.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, PartialOrd, Ord,
)]
pub enum Phase {
	/// Ranked lowest: one failing node pins the whole graph's aggregate state.
	Error,
	Registered,
	Initialized,
	Connected,
	Ready,
	Previewing,
	Recording,
	Stopped,
	Saved,
	Shutdown,
}

impl Display for Phase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Error => write!(f, "ERROR"),
			Self::Registered => write!(f, "REGISTERED"),
			Self::Initialized => write!(f, "INITIALIZED"),
			Self::Connected => write!(f, "CONNECTED"),
			Self::Ready => write!(f, "READY"),
			Self::Previewing => write!(f, "PREVIEWING"),
			Self::Recording => write!(f, "RECORDING"),
			Self::Stopped => write!(f, "STOPPED"),
			Self::Saved => write!(f, "SAVED"),
			Self::Shutdown => write!(f, "SHUTDOWN"),
		}
	}
}

/// A command that drives a [`Phase`] transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Command {
	CreateNode,
	SetupConnections,
	Start,
	Record,
	Stop,
	Collect,
	Gather,
	DestroyNode,
}

impl Display for Command {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::CreateNode => write!(f, "create_node"),
			Self::SetupConnections => write!(f, "setup_connections"),
			Self::Start => write!(f, "start"),
			Self::Record => write!(f, "record"),
			Self::Stop => write!(f, "stop"),
			Self::Collect => write!(f, "collect"),
			Self::Gather => write!(f, "gather"),
			Self::DestroyNode => write!(f, "destroy_node"),
		}
	}
}

/// Returns `true` if `command` may be applied while a participant is at `current`.
///
/// `Gather` never changes phase, and is legal from `Previewing` onward
/// (including `Stopped`, per the resolved "gather after stop" design note).
/// `DestroyNode` is legal from any phase.
pub fn precondition_met(command: Command, current: Phase) -> bool {
	match command {
		Command::CreateNode => current == Phase::Registered,
		Command::SetupConnections => current == Phase::Initialized,
		Command::Start => matches!(current, Phase::Connected | Phase::Stopped),
		Command::Record => current == Phase::Previewing,
		Command::Stop => matches!(current, Phase::Previewing | Phase::Recording),
		Command::Collect => current == Phase::Stopped,
		Command::Gather => current >= Phase::Previewing,
		Command::DestroyNode => true,
	}
}

/// The phase a participant reaches after successfully applying `command`,
/// or `None` for commands (like `Gather`) that never change phase.
pub fn post_state(command: Command) -> Option<Phase> {
	match command {
		Command::CreateNode => Some(Phase::Initialized),
		Command::SetupConnections => Some(Phase::Connected),
		Command::Start => Some(Phase::Previewing),
		Command::Record => Some(Phase::Recording),
		Command::Stop => Some(Phase::Stopped),
		Command::Collect => Some(Phase::Saved),
		Command::Gather => None,
		Command::DestroyNode => Some(Phase::Shutdown),
	}
}

/// A command is idempotent when the participant is already at the state the
/// command would have produced.
pub fn is_idempotent_repeat(command: Command, current: Phase) -> bool {
	post_state(command).is_some_and(|target| target == current)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_ranks_below_every_other_phase() {
		for phase in [
			Phase::Registered,
			Phase::Initialized,
			Phase::Connected,
			Phase::Ready,
			Phase::Previewing,
			Phase::Recording,
			Phase::Stopped,
			Phase::Saved,
			Phase::Shutdown,
		] {
			assert!(Phase::Error < phase);
		}
	}

	#[test]
	fn aggregate_state_is_pointwise_minimum() {
		let states = [Phase::Connected, Phase::Previewing, Phase::Recording];
		assert_eq!(states.iter().copied().min(), Some(Phase::Connected));

		let with_error = [Phase::Previewing, Phase::Error, Phase::Recording];
		assert_eq!(with_error.iter().copied().min(), Some(Phase::Error));
	}

	#[test]
	fn invalid_precondition_is_rejected() {
		assert!(!precondition_met(Command::Record, Phase::Connected));
		assert!(precondition_met(Command::Record, Phase::Previewing));
	}

	#[test]
	fn duplicate_command_is_idempotent() {
		assert!(is_idempotent_repeat(Command::Start, Phase::Previewing));
		assert!(!is_idempotent_repeat(Command::Start, Phase::Connected));
	}

	#[test]
	fn gather_never_changes_phase() {
		assert_eq!(post_state(Command::Gather), None);
		assert!(precondition_met(Command::Gather, Phase::Stopped));
		assert!(!precondition_met(Command::Gather, Phase::Connected));
	}

	#[test]
	fn fsm_is_monotonic_along_the_happy_path() {
		let path = [
			Command::CreateNode,
			Command::SetupConnections,
			Command::Start,
			Command::Record,
			Command::Stop,
			Command::Collect,
		];
		let mut phase = Phase::Registered;
		for command in path {
			assert!(precondition_met(command, phase));
			phase = post_state(command).unwrap_or(phase);
		}
		assert_eq!(phase, Phase::Saved);
	}
}
