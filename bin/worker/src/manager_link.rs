//! Registration with the manager: a persistent signal-channel connection,
//! mirroring how a node registers with its worker. Node/graph operations
//! themselves run over the worker's HTTP surface — this connection exists
//! so the manager can detect an unexpected disconnect and mark this
//! worker's nodes errored without forgetting the worker entirely.

use chimera_protocol::{MessageEnvelope, Signal};
use chimera_transport::{SignalClient, TransportError};
use tracing::{info, warn};

pub async fn register_with_manager(
	worker_id: &str,
	self_host: &str,
	self_port: u16,
	manager_host: &str,
	manager_port: u16,
	ack_timeout: std::time::Duration,
) -> Result<SignalClient, TransportError> {
	let client = SignalClient::connect_with(
		worker_id,
		manager_host,
		manager_port,
		ack_timeout,
		serde_json::json!({ "host": self_host, "port": self_port }),
	)
	.await?;
	info!(worker_id, manager_host, manager_port, "registered with manager");
	return Ok(client);
}

/// Drain frames from the manager until it disconnects or sends `SHUTDOWN`.
/// The worker's actual command surface is HTTP; this loop only exists to
/// notice disconnects and to honor a manager-initiated shutdown.
pub async fn run(client: SignalClient) {
	while let Some(envelope) = client.recv().await {
		if envelope.signal == Signal::Shutdown {
			let _ = client
				.send(MessageEnvelope::ack_for(envelope.uuid))
				.await;
			break;
		}
		warn!(signal = ?envelope.signal, "unexpected signal from manager, dropped");
	}
}
