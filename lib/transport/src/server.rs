//! The signal-channel server side: an axum `/ws` route shared by the
//! Manager (accepting Worker connections) and the Worker (accepting Node
//! connections). Each accepted socket becomes a [`PeerChannel`] the
//! owning service can send commands through and read reports from.

use crate::TransportError;
use axum::extract::ws::{Message, WebSocket};
use chimera_protocol::{AckRing, MessageEnvelope, Signal};
use futures::{SinkExt, StreamExt};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

type PendingAcks = Arc<Mutex<HashMap<Uuid, oneshot::Sender<serde_json::Value>>>>;

/// One accepted `/ws` connection, not yet known to belong to a particular
/// peer until its `CLIENT_REGISTER` frame arrives.
pub struct PeerChannel {
	writer: mpsc::UnboundedSender<Message>,
	pending: PendingAcks,
	ack_timeout: Duration,
	inbox: Mutex<mpsc::UnboundedReceiver<MessageEnvelope>>,
}

impl PeerChannel {
	/// Accept an upgraded socket and spin up its reader/writer tasks.
	/// Unknown signals are logged and dropped (§4.2); they never close
	/// the connection (§8 S5).
	pub fn accept(socket: WebSocket, ack_timeout: Duration) -> Self {
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

		Self {
			writer: write_tx,
			pending,
			ack_timeout,
			inbox: Mutex::new(inbox_rx),
		}
	}

	pub async fn send(&self, envelope: MessageEnvelope) -> Result<(), TransportError> {
		let text = serde_json::to_string(&envelope)?;
		self.writer
			.send(Message::Text(text))
			.map_err(|_| TransportError::ConnectionLost)?;
		return Ok(());
	}

	/// Acknowledge a received frame's uuid.
	pub async fn ack(&self, uuid: Uuid) -> Result<(), TransportError> {
		self.send(MessageEnvelope::ack_for(uuid)).await
	}

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

	pub async fn recv(&self) -> Option<MessageEnvelope> {
		self.inbox.lock().await.recv().await
	}
}

/// The registry of currently-connected peers (workers, as seen by the
/// manager; nodes, as seen by a worker), keyed by their stable id.
#[derive(Clone, Default)]
pub struct PeerRegistry {
	peers: Arc<Mutex<HashMap<String, Arc<PeerChannel>>>>,
}

impl PeerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn insert(&self, id: String, channel: Arc<PeerChannel>) {
		self.peers.lock().await.insert(id, channel);
	}

	/// Drop a peer whose socket closed, per §4.2's reconnect-by-stable-id rule.
	pub async fn remove(&self, id: &str) {
		self.peers.lock().await.remove(id);
	}

	pub async fn get(&self, id: &str) -> Option<Arc<PeerChannel>> {
		self.peers.lock().await.get(id).cloned()
	}

	pub async fn ids(&self) -> Vec<String> {
		self.peers.lock().await.keys().cloned().collect()
	}
}
