use api::RouterState;
use chimera_node_kit::base::NodeDispatcher;
use chimera_util::{load_env, LoadedEnv};
use config::WorkerConfig;
use node_handler::{NodeHandler, WorkerNodeConfig};
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, error, info, warn};

mod api;
mod config;
mod manager_link;
mod node_handler;

#[tokio::main]
async fn main() {
	let config_res = match load_env::<WorkerConfig>() {
		Ok(x) => x,
		Err(err) => {
			println!("Error while loading .env: {err}");
			std::process::exit(1);
		}
	};

	let config: Arc<WorkerConfig> = Arc::new(config_res.get_config().clone());

	tracing_subscriber::fmt()
		.with_env_filter(config.worker_loglevel.get_config())
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

	let (self_host, self_port) = match config.worker_server_addr.rsplit_once(':') {
		Some((host, port)) => match port.parse::<u16>() {
			Ok(port) => (host.to_string(), port),
			Err(_) => {
				error!(addr = %config.worker_server_addr, "worker_server_addr has an invalid port");
				std::process::exit(1);
			}
		},
		None => {
			error!(addr = %config.worker_server_addr, "worker_server_addr must be host:port");
			std::process::exit(1);
		}
	};

	let mut dispatcher = NodeDispatcher::new();
	if let Err(error) = nodes_example::register(&mut dispatcher) {
		error!(?error, "could not register node types");
		std::process::exit(1);
	}

	let handler = Arc::new(NodeHandler::new(
		dispatcher,
		WorkerNodeConfig {
			bind_host: self_host.clone(),
			self_host: self_host.clone(),
			self_port,
			staging_root: PathBuf::from(config.worker_staging_dir.as_str()),
			archiver_bin: PathBuf::from(config.worker_archiver_bin.as_str()),
			ack_timeout: config.ack_timeout(),
			zip_budget: config.zip_budget(),
			self_file_post_url: format!("http://{}/file/post", config.worker_server_addr),
			manager_file_post_url: format!("http://{}/file/post", config.worker_manager_addr),
		},
	));

	let state = RouterState {
		config: config.clone(),
		handler,
	};

	let listener = match tokio::net::TcpListener::bind(config.worker_server_addr.to_string()).await {
		Ok(listener) => listener,
		Err(error) => {
			error!(%error, addr = %config.worker_server_addr, "could not bind worker server");
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

	let (manager_host, manager_port) = match config.worker_manager_addr.rsplit_once(':') {
		Some((host, port)) => match port.parse::<u16>() {
			Ok(port) => (host.to_string(), port),
			Err(_) => {
				error!(addr = %config.worker_manager_addr, "worker_manager_addr has an invalid port");
				std::process::exit(1);
			}
		},
		None => {
			error!(addr = %config.worker_manager_addr, "worker_manager_addr must be host:port");
			std::process::exit(1);
		}
	};

	let worker_id = config.worker_id.to_string();
	let ack_timeout = config.ack_timeout();
	tokio::spawn(async move {
		loop {
			match manager_link::register_with_manager(
				&worker_id,
				&self_host,
				self_port,
				&manager_host,
				manager_port,
				ack_timeout,
			)
			.await
			{
				Ok(client) => manager_link::run(client).await,
				Err(error) => {
					warn!(%error, manager_host, manager_port, "could not reach manager, retrying");
				}
			}
			tokio::time::sleep(std::time::Duration::from_secs(2)).await;
		}
	});

	let app = api::router(state);
	if let Err(error) = axum::serve(listener, app).await {
		error!(%error, "worker server exited with an error");
	}
}
