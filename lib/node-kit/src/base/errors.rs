use smartstring::{LazyCompact, SmartString};
use std::{error::Error, fmt::Display, sync::Arc};

use super::PortName;

/// An error encountered while running a node. Confined to that node —
/// its execution context may crash, but the worker survives (§7).
#[derive(Debug, Clone)]
pub enum RunNodeError {
	/// We expected a parameter, but it wasn't there.
	MissingParameter { parameter: SmartString<LazyCompact> },

	/// A parameter had an unexpected type or value.
	BadParameter {
		parameter: SmartString<LazyCompact>,
		message: String,
	},

	/// We did not receive a required input on the current step.
	MissingInput { port: PortName },

	/// We received an input on a port we don't recognize.
	UnrecognizedInput { port: PortName },

	/// `REQUEST_METHOD` named a method this node does not register.
	UnknownMethod { name: SmartString<LazyCompact> },

	/// A generic I/O error (record sink, staging directory).
	IoError(Arc<std::io::Error>),

	/// An arbitrary error from user node code.
	Other(Arc<dyn Error + Sync + Send + 'static>),
}

impl Display for RunNodeError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::MissingParameter { parameter } => write!(f, "missing parameter `{parameter}`"),
			Self::BadParameter { parameter, message } => {
				write!(f, "bad parameter `{parameter}`: {message}")
			}
			Self::MissingInput { port } => write!(f, "we did not receive input on port `{port}`"),
			Self::UnrecognizedInput { port } => {
				write!(f, "received input on unrecognized port `{port}`")
			}
			Self::UnknownMethod { name } => write!(f, "no method named `{name}`"),
			Self::IoError(_) => write!(f, "I/O error"),
			Self::Other(_) => write!(f, "generic error"),
		}
	}
}

impl Error for RunNodeError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Other(x) => Some(x.as_ref()),
			Self::IoError(x) => Some(x.as_ref()),
			_ => None,
		}
	}
}

impl From<std::io::Error> for RunNodeError {
	fn from(value: std::io::Error) -> Self {
		Self::IoError(Arc::new(value))
	}
}
