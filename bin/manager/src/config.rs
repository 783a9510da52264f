use chimera_util::logging::LoggingPreset;
use serde::Deserialize;
use smartstring::{LazyCompact, SmartString};
use std::time::Duration;

/// Note that the fields of this struct are not capitalized.
/// Envy is case-insensitive, and expects Rust fields to be snake_case.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
	/// IP and port this manager's HTTP+WS server binds to.
	/// Should look like `127.0.0.1:3030`
	pub manager_server_addr: SmartString<LazyCompact>,

	/// Where collected node archives are staged once forwarded by a worker.
	#[serde(default = "ManagerConfig::default_staging_dir")]
	pub manager_staging_dir: SmartString<LazyCompact>,

	/// `comms.timeout.ok`, in milliseconds: ack wait on the signal channel.
	#[serde(default = "ManagerConfig::default_ack_timeout_ms")]
	pub manager_ack_timeout_ms: u64,

	/// `manager.timeout.info-request`, in seconds: maximum wait for any
	/// single manager->worker HTTP RPC.
	#[serde(default = "ManagerConfig::default_info_request_timeout_secs")]
	pub manager_info_request_timeout_secs: u64,

	/// Maximum request body size, in bytes, for the manager's HTTP surface.
	#[serde(default = "ManagerConfig::default_request_body_limit")]
	pub manager_request_body_limit: usize,

	#[serde(default)]
	pub manager_loglevel: LoggingPreset,
}

impl ManagerConfig {
	fn default_staging_dir() -> SmartString<LazyCompact> {
		"./staging".into()
	}

	fn default_ack_timeout_ms() -> u64 {
		5_000
	}

	fn default_info_request_timeout_secs() -> u64 {
		10
	}

	fn default_request_body_limit() -> usize {
		2_000_000
	}

	pub fn ack_timeout(&self) -> Duration {
		Duration::from_millis(self.manager_ack_timeout_ms)
	}

	pub fn info_request_timeout(&self) -> Duration {
		Duration::from_secs(self.manager_info_request_timeout_secs)
	}
}
