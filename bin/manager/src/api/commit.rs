//! `POST /commit`: validate and apply a graph + placement (§4.3).

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chimera_protocol::{GraphSpec, Placement};
use serde::Deserialize;
use tracing::warn;

use super::RouterState;
use crate::worker_handler::WorkerHandlerError;

#[derive(Deserialize)]
pub struct CommitBody {
	graph: GraphSpec,
	placement: Placement,
}

pub async fn post(State(state): State<RouterState>, Json(body): Json<CommitBody>) -> impl IntoResponse {
	match state.handler.commit(body.graph, body.placement).await {
		Ok(()) => StatusCode::OK,
		Err(error @ (WorkerHandlerError::Placement(_) | WorkerHandlerError::AlreadyCommitted)) => {
			warn!(%error, "commit rejected");
			StatusCode::CONFLICT
		}
		Err(error) => {
			warn!(%error, "commit failed");
			StatusCode::INTERNAL_SERVER_ERROR
		}
	}
}
