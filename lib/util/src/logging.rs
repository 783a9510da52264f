use std::{fmt::Display, str::FromStr};

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum LogLevel {
	Trace,
	Debug,
	Info,
	Warn,
	Error,
}

impl Default for LogLevel {
	fn default() -> Self {
		Self::Info
	}
}

impl Display for LogLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Trace => write!(f, "trace"),
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warn => write!(f, "warn"),
			Self::Error => write!(f, "error"),
		}
	}
}

#[derive(Debug, Deserialize)]
pub enum LoggingPreset {
	Default,
	Verbose,
	Develop,
	Trace,
}

impl Default for LoggingPreset {
	fn default() -> Self {
		return Self::Default;
	}
}

impl LoggingPreset {
	pub fn get_config(&self) -> LoggingConfig {
		match self {
			Self::Default => LoggingConfig {
				other: LogLevel::Warn,
				http: LogLevel::Warn,

				manager: LogLevel::Info,
				worker: LogLevel::Info,
				transport: LogLevel::Info,
				protocol: LogLevel::Info,
				nodes: LogLevel::Warn,
			},

			Self::Verbose => LoggingConfig {
				other: LogLevel::Warn,
				http: LogLevel::Warn,

				manager: LogLevel::Debug,
				worker: LogLevel::Debug,
				transport: LogLevel::Debug,
				protocol: LogLevel::Debug,
				nodes: LogLevel::Warn,
			},

			Self::Develop => LoggingConfig {
				other: LogLevel::Debug,
				http: LogLevel::Warn,

				manager: LogLevel::Trace,
				worker: LogLevel::Trace,
				transport: LogLevel::Trace,
				protocol: LogLevel::Debug,
				nodes: LogLevel::Warn,
			},

			Self::Trace => LoggingConfig {
				other: LogLevel::Trace,
				http: LogLevel::Warn,

				manager: LogLevel::Trace,
				worker: LogLevel::Trace,
				transport: LogLevel::Trace,
				protocol: LogLevel::Trace,
				nodes: LogLevel::Trace,
			},
		}
	}
}

pub struct LoggingConfig {
	other: LogLevel,
	http: LogLevel,

	manager: LogLevel,
	worker: LogLevel,
	transport: LogLevel,
	protocol: LogLevel,
	nodes: LogLevel,
}

impl Into<EnvFilter> for LoggingConfig {
	fn into(self) -> EnvFilter {
		EnvFilter::from_str(
			&[
				//
				// Non-configurable sources
				//
				format!("hyper={}", LogLevel::Warn),
				format!("tungstenite={}", LogLevel::Warn),
				//
				// Configurable sources
				//
				format!("tower_http={}", self.http),
				// // Control plane
				format!("chimera_manager={}", self.manager),
				format!("chimera_worker={}", self.worker),
				format!("chimera_transport={}", self.transport),
				format!("chimera_protocol={}", self.protocol),
				// Node implementations
				format!("chimera_node_kit={}", self.nodes),
				format!("nodes_example={}", self.nodes),
				self.other.to_string(),
			]
			.join(","),
		)
		.unwrap()
	}
}
