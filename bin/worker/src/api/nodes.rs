//! The worker's node-management HTTP surface (§4.4, §6).

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json, Router};
use chimera_protocol::{MessageEnvelope, NodeId, NodePubTable, NodeSpec, Signal};
use serde::Deserialize;
use tracing::warn;

use super::RouterState;
use crate::node_handler::NodeHandlerError;

pub fn router() -> Router<RouterState> {
	Router::new()
		.route("/create", axum::routing::post(create))
		.route("/destroy", axum::routing::post(destroy))
		.route("/server_data", axum::routing::post(server_data))
		.route("/start", axum::routing::post(start))
		.route("/record", axum::routing::post(record))
		.route("/stop", axum::routing::post(stop))
		.route("/save", axum::routing::post(save))
		.route("/gather", axum::routing::post(gather))
}

#[derive(Deserialize)]
pub struct NodeIdsBody {
	node_ids: Vec<NodeId>,
}

fn status_for(error: &NodeHandlerError) -> StatusCode {
	match error {
		NodeHandlerError::UnknownNodeClass(_) | NodeHandlerError::UnknownNode(_) => StatusCode::NOT_FOUND,
		NodeHandlerError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

async fn create(State(state): State<RouterState>, Json(spec): Json<NodeSpec>) -> impl IntoResponse {
	match state.handler.create_node(&spec).await {
		Ok(node_state) => (StatusCode::OK, Json(node_state)).into_response(),
		Err(error) => {
			warn!(%error, node_id = %spec.node_id, "create_node failed");
			status_for(&error).into_response()
		}
	}
}

async fn destroy(State(state): State<RouterState>, Json(body): Json<NodeIdsBody>) -> impl IntoResponse {
	for node_id in &body.node_ids {
		let Some(channel) = state.handler.peers().get(&node_id.to_string()).await else {
			continue;
		};
		let _ = channel
			.send(MessageEnvelope::new(Signal::Shutdown, serde_json::json!({})))
			.await;
		state.handler.peers().remove(&node_id.to_string()).await;
	}
	return StatusCode::OK;
}

async fn server_data(State(state): State<RouterState>, Json(table): Json<NodePubTable>) -> impl IntoResponse {
	match state.handler.setup_connections(&table).await {
		Ok(()) => StatusCode::OK,
		Err(error) => {
			warn!(%error, "setup_connections failed");
			status_for(&error)
		}
	}
}

async fn start(State(state): State<RouterState>, Json(body): Json<NodeIdsBody>) -> impl IntoResponse {
	match state.handler.start_nodes(&body.node_ids).await {
		Ok(states) => Json(states).into_response(),
		Err(error) => status_for(&error).into_response(),
	}
}

async fn record(State(state): State<RouterState>, Json(body): Json<NodeIdsBody>) -> impl IntoResponse {
	match state.handler.record_nodes(&body.node_ids).await {
		Ok(states) => Json(states).into_response(),
		Err(error) => status_for(&error).into_response(),
	}
}

async fn stop(State(state): State<RouterState>, Json(body): Json<NodeIdsBody>) -> impl IntoResponse {
	match state.handler.stop_nodes(&body.node_ids).await {
		Ok(states) => Json(states).into_response(),
		Err(error) => status_for(&error).into_response(),
	}
}

async fn save(State(state): State<RouterState>, Json(body): Json<NodeIdsBody>) -> impl IntoResponse {
	let states = match state.handler.collect_nodes(&body.node_ids).await {
		Ok(states) => states,
		Err(error) => {
			warn!(%error, "collect_nodes failed");
			return status_for(&error).into_response();
		}
	};
	match state.handler.forward_to_manager(&body.node_ids).await {
		Ok(()) => Json(states).into_response(),
		Err(error) => {
			warn!(%error, "forwarding collected artifacts to manager failed");
			status_for(&error).into_response()
		}
	}
}

async fn gather(State(state): State<RouterState>, Json(body): Json<NodeIdsBody>) -> impl IntoResponse {
	match state.handler.gather_nodes(&body.node_ids).await {
		Ok(samples) => Json(samples).into_response(),
		Err(error) => status_for(&error).into_response(),
	}
}
