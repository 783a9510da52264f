use api::RouterState;
use chimera_util::{load_env, LoadedEnv};
use config::ManagerConfig;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, error, info};
use worker_handler::{WorkerHandler, WorkerHandlerConfig};

mod api;
mod config;
mod worker_handler;

#[tokio::main]
async fn main() {
	let config_res = match load_env::<ManagerConfig>() {
		Ok(x) => x,
		Err(err) => {
			println!("Error while loading .env: {err}");
			std::process::exit(1);
		}
	};

	let config: Arc<ManagerConfig> = Arc::new(config_res.get_config().clone());

	tracing_subscriber::fmt()
		.with_env_filter(config.manager_loglevel.get_config())
		.without_time()
		.with_ansi(true)
		.init();

	match config_res {
		LoadedEnv::FoundFile { config, path } => {
			debug!(message = "Loaded config from .env", ?path, ?config);
		}
		LoadedEnv::OnlyVars(config) => {
			debug!(message = "No `.env` found, loaded config from environment", ?config);
		}
	};

	let handler = Arc::new(WorkerHandler::new(WorkerHandlerConfig {
		staging_root: PathBuf::from(config.manager_staging_dir.as_str()),
		info_request_timeout: config.info_request_timeout(),
	}));

	let state = RouterState {
		config: config.clone(),
		handler,
	};

	let listener = match tokio::net::TcpListener::bind(config.manager_server_addr.to_string()).await {
		Ok(listener) => listener,
		Err(error) => {
			error!(%error, addr = %config.manager_server_addr, "could not bind manager server");
			std::process::exit(1);
		}
	};

	match listener.local_addr() {
		Ok(addr) => info!("listening on http://{addr}"),
		Err(error) => {
			error!(%error, "could not determine local address");
			std::process::exit(1);
		}
	}

	let app = api::router(state);
	if let Err(error) = axum::serve(listener, app).await {
		error!(%error, "manager server exited with an error");
	}
}
