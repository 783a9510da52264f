//! `/ws`: the signal channel workers connect to at startup (§4.2, §4.3).

use axum::extract::{
	ws::{WebSocket, WebSocketUpgrade},
	State,
};
use chimera_protocol::{Signal, WorkerId};
use chimera_transport::PeerChannel;
use std::sync::Arc;
use tracing::{info, warn};

use super::RouterState;
use crate::worker_handler::parse_worker_register;

pub async fn handle_upgrade(ws: WebSocketUpgrade, State(state): State<RouterState>) -> axum::response::Response {
	ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(socket: WebSocket, state: RouterState) {
	let channel = Arc::new(PeerChannel::accept(socket, state.config.ack_timeout()));

	let Some((worker_id, host, port)) = await_registration(&channel).await else {
		warn!("worker connection closed before registering");
		return;
	};

	if let Err(error) = state.handler.register_worker(worker_id.clone(), host, port).await {
		warn!(%worker_id, %error, "worker registration rejected");
		return;
	}
	info!(%worker_id, "worker connected");

	while let Some(envelope) = channel.recv().await {
		match envelope.signal {
			Signal::Shutdown => break,
			other => warn!(%worker_id, signal = ?other, "unexpected signal from worker"),
		}
	}

	state.handler.mark_worker_unreachable(&worker_id).await;
	info!(%worker_id, "worker disconnected");
}

async fn await_registration(channel: &PeerChannel) -> Option<(WorkerId, String, u16)> {
	loop {
		let envelope = channel.recv().await?;
		if envelope.signal == Signal::ClientRegister {
			return parse_worker_register(&envelope);
		}
	}
}
