use chimera_util::logging::LoggingPreset;
use serde::Deserialize;
use smartstring::{LazyCompact, SmartString};
use std::time::Duration;

/// Note that the fields of this struct are not capitalized.
/// Envy is case-insensitive, and expects Rust fields to be snake_case.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
	/// IP and port this worker's HTTP+WS server binds to.
	/// Should look like `127.0.0.1:3031`
	pub worker_server_addr: SmartString<LazyCompact>,

	/// The worker's stable id, reported to the manager's placement table.
	pub worker_id: SmartString<LazyCompact>,

	/// IP and port of the manager's HTTP server, used to forward collected
	/// artifacts once a node's output has been staged locally.
	pub worker_manager_addr: SmartString<LazyCompact>,

	/// Where archived node output is staged before upload to the manager.
	#[serde(default = "WorkerConfig::default_staging_dir")]
	pub worker_staging_dir: SmartString<LazyCompact>,

	/// Path to the `archiver` binary used to zip a node's output directory.
	#[serde(default = "WorkerConfig::default_archiver_bin")]
	pub worker_archiver_bin: SmartString<LazyCompact>,

	/// `comms.timeout.ok`, in milliseconds: ack wait.
	#[serde(default = "WorkerConfig::default_ack_timeout_ms")]
	pub worker_ack_timeout_ms: u64,

	/// `comms.timeout.zip-time`, in seconds: cumulative backoff budget for
	/// archive creation.
	#[serde(default = "WorkerConfig::default_zip_budget_secs")]
	pub worker_zip_budget_secs: u64,

	/// Maximum request body size, in bytes, for the worker's HTTP surface.
	#[serde(default = "WorkerConfig::default_request_body_limit")]
	pub worker_request_body_limit: usize,

	#[serde(default)]
	pub worker_loglevel: LoggingPreset,
}

impl WorkerConfig {
	fn default_staging_dir() -> SmartString<LazyCompact> {
		"./staging".into()
	}

	fn default_archiver_bin() -> SmartString<LazyCompact> {
		"./archiver".into()
	}

	fn default_ack_timeout_ms() -> u64 {
		5_000
	}

	fn default_zip_budget_secs() -> u64 {
		30
	}

	fn default_request_body_limit() -> usize {
		2_000_000
	}

	pub fn ack_timeout(&self) -> Duration {
		Duration::from_millis(self.worker_ack_timeout_ms)
	}

	pub fn zip_budget(&self) -> Duration {
		Duration::from_secs(self.worker_zip_budget_secs)
	}
}
