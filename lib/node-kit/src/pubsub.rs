//! Raw point-to-point sample transport between nodes (§3): newline-delimited
//! JSON over a plain tokio TCP connection. There is no broker — the manager
//! only ever exchanges publisher addresses, never samples themselves.

use chimera_protocol::NodeId;
use chimera_transport::TransportError;
use std::{collections::BTreeMap, net::SocketAddr, sync::Arc};
use tokio::{
	io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
	net::{TcpListener, TcpStream},
	sync::{broadcast, Mutex},
};
use tracing::warn;

/// This node's outbound sample feed. Every `step` output is broadcast to
/// whichever subscribers happen to be connected; a quiet socket is not an
/// error, it just means nobody has armed a subscriber yet.
pub struct Publisher {
	local_addr: SocketAddr,
	tx: broadcast::Sender<serde_json::Value>,
}

impl Publisher {
	/// Bind an ephemeral port on `bind_host` and start accepting subscribers.
	pub async fn bind(bind_host: &str) -> Result<Self, TransportError> {
		let listener = TcpListener::bind((bind_host, 0)).await?;
		let local_addr = listener.local_addr()?;
		let (tx, _rx) = broadcast::channel(64);

		let accept_tx = tx.clone();
		tokio::spawn(async move {
			loop {
				let (socket, _peer) = match listener.accept().await {
					Ok(pair) => pair,
					Err(error) => {
						warn!(%error, "publisher accept failed");
						continue;
					}
				};
				let mut rx = accept_tx.subscribe();
				tokio::spawn(async move {
					let (_read_half, mut write_half) = socket.into_split();
					while let Ok(sample) = rx.recv().await {
						let Ok(mut line) = serde_json::to_string(&sample) else {
							continue;
						};
						line.push('\n');
						if write_half.write_all(line.as_bytes()).await.is_err() {
							break;
						}
					}
				});
			}
		});

		return Ok(Self { local_addr, tx });
	}

	pub fn addr(&self) -> SocketAddr {
		self.local_addr
	}

	/// Broadcast a fresh sample to every currently connected subscriber.
	pub fn publish(&self, sample: serde_json::Value) {
		let _ = self.tx.send(sample);
	}
}

/// The latest sample seen from each armed input, kept fresh by a
/// background reader task per connection (§4.5 `BROADCAST_NODE_SERVER`).
#[derive(Clone, Default)]
pub struct SubscriberSet {
	latest: Arc<Mutex<BTreeMap<NodeId, Option<serde_json::Value>>>>,
}

impl SubscriberSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Connect to every `(node_id, host, port)` triple and start tracking
	/// its latest sample, replacing whatever was previously armed.
	pub async fn arm(&self, addresses: &[(NodeId, String, u16)]) -> Result<(), TransportError> {
		let mut latest = self.latest.lock().await;
		latest.clear();
		for (node_id, host, port) in addresses {
			latest.insert(node_id.clone(), None);
			let stream = TcpStream::connect((host.as_str(), *port)).await?;
			let map = self.latest.clone();
			let node_id = node_id.clone();
			tokio::spawn(async move {
				let mut lines = BufReader::new(stream).lines();
				loop {
					match lines.next_line().await {
						Ok(Some(line)) => {
							let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) else {
								continue;
							};
							map.lock().await.insert(node_id.clone(), Some(value));
						}
						// Connection closed or errored: leave the last-seen sample in place.
						_ => break,
					}
				}
			});
		}
		return Ok(());
	}

	/// A copy of the latest sample seen from each armed input.
	pub async fn snapshot(&self) -> BTreeMap<NodeId, Option<serde_json::Value>> {
		self.latest.lock().await.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn publisher_reaches_a_connected_subscriber() {
		let publisher = Publisher::bind("127.0.0.1").await.unwrap();
		let addr = publisher.addr();

		let subscribers = SubscriberSet::new();
		subscribers
			.arm(&[(NodeId::new("Gen1"), addr.ip().to_string(), addr.port())])
			.await
			.unwrap();

		// Give the publisher's accept loop a moment to register the connection.
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		publisher.publish(serde_json::json!({ "value": 42 }));
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;

		let snapshot = subscribers.snapshot().await;
		assert_eq!(
			snapshot.get(&NodeId::new("Gen1")).cloned().flatten(),
			Some(serde_json::json!({ "value": 42 }))
		);
	}
}
