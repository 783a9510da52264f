//! Transport errors. Unlike `chimera_protocol::ProtocolError`, these wrap
//! heterogeneous underlying causes (io, websocket, http, join errors), so
//! — matching the mixed style this workspace already uses for its
//! transport-adjacent error types — they get a manual `Display`/`Error`
//! impl with `From` conversions rather than a blanket `thiserror` derive.

use std::{error::Error, fmt::Display, sync::Arc};

#[derive(Debug, Clone)]
pub enum TransportError {
	/// The socket closed, or a send/receive failed outright.
	ConnectionLost,

	/// An awaited operation (ack, RPC, broadcast) exceeded its deadline.
	Timeout,

	/// `comms.timeout.zip-time` was exhausted before an archive could be produced.
	ArchiveError,

	/// A frame or HTTP body could not be decoded as the expected type.
	Decode(Arc<serde_json::Error>),

	Io(Arc<std::io::Error>),

	WebSocket(Arc<tokio_tungstenite::tungstenite::Error>),

	Http(Arc<reqwest::Error>),

	/// The worker-side execution context for a node (process or join handle)
	/// could not be joined cleanly.
	Join(Arc<tokio::task::JoinError>),

	Other(Arc<dyn Error + Sync + Send>),
}

impl Display for TransportError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::ConnectionLost => write!(f, "connection lost"),
			Self::Timeout => write!(f, "operation timed out"),
			Self::ArchiveError => write!(f, "archive creation exhausted its retry budget"),
			Self::Decode(e) => write!(f, "could not decode message: {e}"),
			Self::Io(e) => write!(f, "i/o error: {e}"),
			Self::WebSocket(e) => write!(f, "websocket error: {e}"),
			Self::Http(e) => write!(f, "http error: {e}"),
			Self::Join(e) => write!(f, "execution context join error: {e}"),
			Self::Other(e) => write!(f, "{e}"),
		}
	}
}

impl Error for TransportError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Decode(e) => Some(e.as_ref()),
			Self::Io(e) => Some(e.as_ref()),
			Self::WebSocket(e) => Some(e.as_ref()),
			Self::Http(e) => Some(e.as_ref()),
			Self::Join(e) => Some(e.as_ref()),
			Self::Other(e) => Some(e.as_ref()),
			Self::ConnectionLost | Self::Timeout | Self::ArchiveError => None,
		}
	}
}

impl From<serde_json::Error> for TransportError {
	fn from(value: serde_json::Error) -> Self {
		Self::Decode(Arc::new(value))
	}
}

impl From<std::io::Error> for TransportError {
	fn from(value: std::io::Error) -> Self {
		Self::Io(Arc::new(value))
	}
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
	fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
		Self::WebSocket(Arc::new(value))
	}
}

impl From<reqwest::Error> for TransportError {
	fn from(value: reqwest::Error) -> Self {
		Self::Http(Arc::new(value))
	}
}

impl From<tokio::task::JoinError> for TransportError {
	fn from(value: tokio::task::JoinError) -> Self {
		Self::Join(Arc::new(value))
	}
}

impl From<tokio::time::error::Elapsed> for TransportError {
	fn from(_: tokio::time::error::Elapsed) -> Self {
		Self::Timeout
	}
}
