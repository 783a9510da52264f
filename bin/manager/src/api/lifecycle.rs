//! `/start`, `/stop`, `/collect`, `/gather`, `/reset` (§4.3, §6).

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::warn;

use super::RouterState;
use crate::worker_handler::WorkerHandlerError;

fn status_for(error: &WorkerHandlerError) -> StatusCode {
	match error {
		WorkerHandlerError::NoActiveCommit
		| WorkerHandlerError::AlreadyCommitted
		| WorkerHandlerError::InvalidPrecondition { .. } => StatusCode::CONFLICT,
		WorkerHandlerError::UnregisteredWorker(_) => StatusCode::NOT_FOUND,
		WorkerHandlerError::Duplicate(_) | WorkerHandlerError::Placement(_) | WorkerHandlerError::Transport(_) => {
			StatusCode::INTERNAL_SERVER_ERROR
		}
	}
}

pub async fn start(State(state): State<RouterState>) -> impl IntoResponse {
	match state.handler.start_workers().await {
		Ok(()) => StatusCode::OK,
		Err(error) => {
			warn!(%error, "start_workers failed");
			status_for(&error)
		}
	}
}

pub async fn record(State(state): State<RouterState>) -> impl IntoResponse {
	match state.handler.record_workers().await {
		Ok(()) => StatusCode::OK,
		Err(error) => {
			warn!(%error, "record_workers failed");
			status_for(&error)
		}
	}
}

pub async fn stop(State(state): State<RouterState>) -> impl IntoResponse {
	match state.handler.stop_workers().await {
		Ok(()) => StatusCode::OK,
		Err(error) => {
			warn!(%error, "stop_workers failed");
			status_for(&error)
		}
	}
}

pub async fn collect(State(state): State<RouterState>) -> impl IntoResponse {
	match state.handler.collect().await {
		Ok(()) => StatusCode::OK,
		Err(error) => {
			warn!(%error, "collect failed");
			status_for(&error)
		}
	}
}

pub async fn gather(State(state): State<RouterState>) -> impl IntoResponse {
	match state.handler.gather().await {
		Ok(samples) => Json(samples).into_response(),
		Err(error) => {
			warn!(%error, "gather failed");
			status_for(&error).into_response()
		}
	}
}

pub async fn reset(State(state): State<RouterState>) -> impl IntoResponse {
	match state.handler.reset().await {
		Ok(()) => StatusCode::OK,
		Err(error) => {
			warn!(%error, "reset failed");
			status_for(&error)
		}
	}
}
