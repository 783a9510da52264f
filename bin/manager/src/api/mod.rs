use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod commit;
mod file;
mod lifecycle;
mod network;
mod ws;

use crate::{config::ManagerConfig, worker_handler::WorkerHandler};

#[derive(Clone)]
pub struct RouterState {
	pub config: Arc<ManagerConfig>,
	pub handler: Arc<WorkerHandler>,
}

pub fn router(state: RouterState) -> Router {
	Router::new()
		.route("/network", axum::routing::get(network::get))
		.route("/commit", axum::routing::post(commit::post))
		.route("/start", axum::routing::post(lifecycle::start))
		.route("/record", axum::routing::post(lifecycle::record))
		.route("/stop", axum::routing::post(lifecycle::stop))
		.route("/collect", axum::routing::post(lifecycle::collect))
		.route("/gather", axum::routing::post(lifecycle::gather))
		.route("/reset", axum::routing::post(lifecycle::reset))
		.route("/file/post", axum::routing::post(file::post))
		.route("/ws", axum::routing::get(ws::handle_upgrade))
		.layer(TraceLayer::new_for_http())
		.layer(DefaultBodyLimit::max(state.config.manager_request_body_limit))
		.with_state(state)
}
