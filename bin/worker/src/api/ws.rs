//! `/ws`: the signal channel hosted nodes connect to (§4.2, §4.5).

use axum::extract::{
	ws::{WebSocket, WebSocketUpgrade},
	State,
};
use chimera_protocol::{NodeId, Phase, Signal};
use chimera_transport::PeerChannel;
use std::sync::Arc;
use tracing::{info, warn};

use super::RouterState;
use crate::node_handler::parse_node_status;

pub async fn handle_upgrade(ws: WebSocketUpgrade, State(state): State<RouterState>) -> axum::response::Response {
	ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(socket: WebSocket, state: RouterState) {
	let channel = Arc::new(PeerChannel::accept(socket, state.config.ack_timeout()));

	let Some(registered_id) = await_registration(&channel).await else {
		warn!("node connection closed before registering");
		return;
	};

	state.handler.peers().insert(registered_id.clone(), channel.clone()).await;
	info!(node_id = registered_id, "node connected");

	while let Some(envelope) = channel.recv().await {
		match envelope.signal {
			Signal::NodeStatus => {
				if let Some((phase, pub_address)) = parse_node_status(&envelope) {
					state
						.handler
						.apply_report(NodeId::new(&registered_id), phase, pub_address)
						.await;
				}
			}
			Signal::ReportGather | Signal::CompleteBroadcast => {
				// Informational only; the synchronous caller already has its
				// answer from the matching ack.
			}
			other => warn!(node_id = registered_id, signal = ?other, "unexpected signal from node"),
		}
	}

	state.handler.peers().remove(&registered_id).await;
	state
		.handler
		.apply_report(NodeId::new(&registered_id), Phase::Error, None)
		.await;
	info!(node_id = registered_id, "node disconnected");
}

async fn await_registration(channel: &PeerChannel) -> Option<String> {
	loop {
		let envelope = channel.recv().await?;
		if envelope.signal == Signal::ClientRegister {
			return envelope.data.get("client_id")?.as_str().map(str::to_owned);
		}
	}
}
