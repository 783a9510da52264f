//! The signal-channel client used by a Worker connecting up to the
//! Manager, and by a Node connecting up to its Worker (§4.2, §4.5).
//!
//! Modeled as an actor with a request mailbox (§9): a background task
//! owns the socket and the ack ring; callers post frames and, for
//! ack-requiring sends, await a oneshot reply. Unsolicited frames are
//! handed to the owner through `inbox` for match-based dispatch — the
//! logical `signal -> handler` mapping of §4.2, expressed as Rust match
//! arms rather than a runtime lookup table.

use crate::TransportError;
use chimera_protocol::{AckRing, MessageEnvelope, Signal};
use futures::{SinkExt, StreamExt};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use uuid::Uuid;

type PendingAcks = Arc<Mutex<HashMap<Uuid, oneshot::Sender<serde_json::Value>>>>;

/// A connected signal-channel client with a stable caller-assigned id.
pub struct SignalClient {
	id: String,
	writer: mpsc::UnboundedSender<Message>,
	pending: PendingAcks,
	ack_timeout: Duration,
	/// Frames the owner has not yet consumed via [`Self::recv`].
	inbox: Mutex<mpsc::UnboundedReceiver<MessageEnvelope>>,
}

impl SignalClient {
	/// Connect to `ws://{host}:{port}/ws` and register with `id`.
	pub async fn connect(
		id: impl Into<String>,
		host: &str,
		port: u16,
		ack_timeout: Duration,
	) -> Result<Self, TransportError> {
		return Self::connect_with(id, host, port, ack_timeout, serde_json::json!({})).await;
	}

	/// Like [`Self::connect`], but merges `extra` fields (e.g. a reachable
	/// `host`/`port` the peer should remember) into the `CLIENT_REGISTER`
	/// payload alongside `client_id`.
	pub async fn connect_with(
		id: impl Into<String>,
		host: &str,
		port: u16,
		ack_timeout: Duration,
		extra: serde_json::Value,
	) -> Result<Self, TransportError> {
		let id = id.into();
		let url = format!("ws://{host}:{port}/ws");
		let (socket, _response) = connect_async(&url).await?;
		let (mut sink, mut stream) = socket.split();

		let (write_tx, mut write_rx) = mpsc::unbounded_channel::<Message>();
		let (inbox_tx, inbox_rx) = mpsc::unbounded_channel::<MessageEnvelope>();
		let pending: PendingAcks = Arc::new(Mutex::new(HashMap::new()));
		let ack_ring = Arc::new(Mutex::new(AckRing::new()));

		tokio::spawn(async move {
			while let Some(message) = write_rx.recv().await {
				if sink.send(message).await.is_err() {
					break;
				}
			}
		});

		let reader_pending = pending.clone();
		tokio::spawn(async move {
			while let Some(frame) = stream.next().await {
				let Ok(frame) = frame else {
					break;
				};
				let Message::Text(text) = frame else {
					continue;
				};
				let envelope: MessageEnvelope = match serde_json::from_str(&text) {
					Ok(envelope) => envelope,
					Err(error) => {
						warn!(%error, "dropping malformed signal-channel frame");
						continue;
					}
				};

				if envelope.signal == Signal::Ok {
					let uuid: Option<Uuid> = envelope
						.data
						.get("uuid")
						.and_then(|v| v.as_str())
						.and_then(|s| s.parse().ok());
					if let Some(uuid) = uuid {
						let mut ring = ack_ring.lock().await;
						if ring.record(uuid) {
							if let Some(sender) = reader_pending.lock().await.remove(&uuid) {
								let result = envelope.data.get("result").cloned().unwrap_or_default();
								let _ = sender.send(result);
							}
						} else {
							debug!(%uuid, "duplicate ack dropped");
						}
					}
					continue;
				}

				if inbox_tx.send(envelope).is_err() {
					break;
				}
			}
		});

		let client = Self {
			id: id.clone(),
			writer: write_tx,
			pending,
			ack_timeout,
			inbox: Mutex::new(inbox_rx),
		};

		let mut register_data = serde_json::json!({ "client_id": id });
		if let (Some(register_map), Some(extra_map)) = (register_data.as_object_mut(), extra.as_object()) {
			register_map.extend(extra_map.clone());
		}
		client
			.send(MessageEnvelope::new(Signal::ClientRegister, register_data))
			.await?;

		return Ok(client);
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	/// Send a frame without waiting for an acknowledgement.
	pub async fn send(&self, envelope: MessageEnvelope) -> Result<(), TransportError> {
		let text = serde_json::to_string(&envelope)?;
		self.writer
			.send(Message::Text(text))
			.map_err(|_| TransportError::ConnectionLost)
	}

	/// Send a frame and wait for its `OK` acknowledgement, failing with
	/// `Timeout` if none arrives within the configured `comms.timeout.ok`.
	/// Returns the `result` payload of request/reply signals, or `Null`
	/// for plain acks.
	pub async fn send_with_ack(
		&self,
		signal: Signal,
		data: serde_json::Value,
	) -> Result<serde_json::Value, TransportError> {
		let envelope = MessageEnvelope::new_with_ack(signal, data);
		let (tx, rx) = oneshot::channel();
		self.pending.lock().await.insert(envelope.uuid, tx);

		if let Err(error) = self.send(envelope.clone()).await {
			self.pending.lock().await.remove(&envelope.uuid);
			return Err(error);
		}

		match tokio::time::timeout(self.ack_timeout, rx).await {
			Ok(Ok(result)) => Ok(result),
			Ok(Err(_)) => Err(TransportError::ConnectionLost),
			Err(_) => {
				self.pending.lock().await.remove(&envelope.uuid);
				Err(TransportError::Timeout)
			}
		}
	}

	/// Receive the next signal addressed to this client that was not an
	/// `OK` acknowledgement (those are consumed internally).
	pub async fn recv(&self) -> Option<MessageEnvelope> {
		self.inbox.lock().await.recv().await
	}

	/// Send `SHUTDOWN` and close the socket, bounded by a fixed 5-second
	/// deadline regardless of the caller's own timeouts (§5 at-exit hook).
	pub async fn shutdown(&self) {
		let _ = tokio::time::timeout(
			Duration::from_secs(5),
			self.send(MessageEnvelope::new(Signal::Shutdown, serde_json::json!({}))),
		)
		.await;
	}
}
