use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod file;
mod nodes;
mod ws;

use crate::{config::WorkerConfig, node_handler::NodeHandler};

#[derive(Clone)]
pub struct RouterState {
	pub config: Arc<WorkerConfig>,
	pub handler: Arc<NodeHandler>,
}

pub fn router(state: RouterState) -> Router {
	Router::new()
		.nest("/nodes", nodes::router())
		.route("/file/post", axum::routing::post(file::post))
		.route("/ws", axum::routing::get(ws::handle_upgrade))
		.layer(TraceLayer::new_for_http())
		.layer(DefaultBodyLimit::max(state.config.worker_request_body_limit))
		.with_state(state)
}
