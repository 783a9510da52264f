//! `GET /network`: the current worker/node snapshot (§4.3, §6).

use axum::{extract::State, Json};
use serde::Serialize;

use super::RouterState;

#[derive(Serialize)]
struct NetworkView {
	aggregate_phase: Option<chimera_protocol::Phase>,
	workers: std::collections::BTreeMap<chimera_protocol::WorkerId, chimera_protocol::WorkerRecord>,
}

pub async fn get(State(state): State<RouterState>) -> Json<NetworkView> {
	Json(NetworkView {
		aggregate_phase: state.handler.aggregate_phase().await,
		workers: state.handler.workers().await,
	})
}
