//! The per-node control loop (§4.5 `WorkerComms`): connects to this node's
//! worker as a signal-channel client, binds a sample publisher, services
//! inbound signals, and reports its own phase after every transition.

use crate::{
	base::{Node, RunNodeError},
	pubsub::{Publisher, SubscriberSet},
};
use chimera_protocol::{
	is_idempotent_repeat, precondition_met, Command, MessageEnvelope, NodeId, NodePubTable, Phase,
	Signal,
};
use chimera_transport::{post_archive, zip_with_retry, SignalClient, TransportError};
use std::{collections::BTreeSet, path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Everything a node's control loop needs that does not depend on which
/// [`Node`] implementation it wraps.
pub struct NodeRuntimeConfig {
	pub node_id: NodeId,
	pub worker_host: String,
	pub worker_port: u16,
	pub bind_host: String,
	pub inputs: BTreeSet<NodeId>,
	pub ack_timeout: Duration,
	pub zip_budget: Duration,
	pub staging_dir: PathBuf,
	pub archiver_bin: PathBuf,
	pub worker_file_post_url: String,
}

pub struct NodeRuntime {
	config: NodeRuntimeConfig,
	node: Box<dyn Node>,
	client: SignalClient,
	publisher: Publisher,
	subscribers: SubscriberSet,
	last_sample: Mutex<Option<serde_json::Value>>,
	/// This node's own view of its phase, checked against
	/// [`precondition_met`] before any command is applied (§4.1).
	phase: Phase,
}

impl NodeRuntime {
	/// Connect to the worker, run `node.setup()`, bind the publisher socket,
	/// and report `INITIALIZED` with the resulting address.
	pub async fn start(
		config: NodeRuntimeConfig,
		mut node: Box<dyn Node>,
	) -> Result<Self, TransportError> {
		let client = SignalClient::connect(
			config.node_id.to_string(),
			&config.worker_host,
			config.worker_port,
			config.ack_timeout,
		)
		.await?;

		node.setup()
			.await
			.map_err(|error| TransportError::Other(Arc::new(error)))?;

		let publisher = Publisher::bind(&config.bind_host).await?;
		let addr = publisher.addr();

		let mut runtime = Self {
			config,
			node,
			client,
			publisher,
			subscribers: SubscriberSet::new(),
			last_sample: Mutex::new(None),
			phase: Phase::Registered,
		};

		runtime
			.client
			.send(MessageEnvelope::new(
				Signal::NodeStatus,
				serde_json::json!({
					"node_id": runtime.config.node_id.to_string(),
					"phase": Phase::Initialized,
					"pub_address": [addr.ip().to_string(), addr.port()],
				}),
			))
			.await?;
		runtime.phase = Phase::Initialized;

		return Ok(runtime);
	}

	/// Drive the control loop until `SHUTDOWN` is received or the
	/// connection to the worker closes.
	pub async fn run(mut self) {
		loop {
			let Some(envelope) = self.client.recv().await else {
				break;
			};
			let signal = envelope.signal;
			if let Err(error) = self.handle(&envelope).await {
				warn!(node_id = %self.config.node_id, %error, ?signal, "node runtime signal failed");
				let _ = self.report_phase(Phase::Error).await;
			}
			if signal == Signal::Shutdown {
				break;
			}
		}
	}

	async fn handle(&mut self, envelope: &MessageEnvelope) -> Result<(), TransportError> {
		if let Some(command) = command_for(envelope.signal) {
			if !precondition_met(command, self.phase) {
				if is_idempotent_repeat(command, self.phase) {
					return self.ack_plain(envelope).await;
				}
				warn!(
					node_id = %self.config.node_id,
					%command,
					current = %self.phase,
					"refusing command: invalid precondition"
				);
				return self.ack_plain(envelope).await;
			}
		}

		match envelope.signal {
			Signal::BroadcastNodeServer => {
				self.on_broadcast_node_server(envelope).await?;
				self.report_phase(Phase::Connected).await?;
				self.phase = Phase::Connected;
				self.ack_plain(envelope).await
			}
			Signal::StartNodes => {
				self.report_phase(Phase::Previewing).await?;
				self.phase = Phase::Previewing;
				self.ack_plain(envelope).await
			}
			Signal::RecordNodes => {
				self.report_phase(Phase::Recording).await?;
				self.phase = Phase::Recording;
				self.ack_plain(envelope).await
			}
			Signal::StopNodes => {
				self.report_phase(Phase::Stopped).await?;
				self.phase = Phase::Stopped;
				self.ack_plain(envelope).await
			}
			Signal::RequestStep => {
				self.on_request_step().await?;
				self.ack_plain(envelope).await
			}
			Signal::RequestGather => {
				let result = self.last_sample.lock().await.clone().unwrap_or(serde_json::Value::Null);
				self.client
					.send(MessageEnvelope::ack_with_result(envelope.uuid, result))
					.await
			}
			Signal::RequestCollect => {
				self.on_request_collect().await?;
				self.ack_plain(envelope).await
			}
			Signal::RequestMethod => {
				let result = self.on_request_method(envelope).await?;
				self.client
					.send(MessageEnvelope::ack_with_result(envelope.uuid, result))
					.await
			}
			Signal::Shutdown => self.ack_plain(envelope).await,
			other => {
				warn!(node_id = %self.config.node_id, signal = ?other, "unhandled signal, dropped");
				Ok(())
			}
		}
	}

	async fn ack_plain(&self, envelope: &MessageEnvelope) -> Result<(), TransportError> {
		if envelope.ok {
			return self.client.send(MessageEnvelope::ack_for(envelope.uuid)).await;
		}
		return Ok(());
	}

	async fn report_phase(&self, phase: Phase) -> Result<(), TransportError> {
		return self
			.client
			.send(MessageEnvelope::new(
				Signal::NodeStatus,
				serde_json::json!({ "node_id": self.config.node_id.to_string(), "phase": phase }),
			))
			.await;
	}

	/// Arm subscribers for this node's declared inputs from the supplied
	/// table. Every declared input must be present (§8 property 5).
	async fn on_broadcast_node_server(&self, envelope: &MessageEnvelope) -> Result<(), TransportError> {
		let table: NodePubTable = serde_json::from_value(envelope.data.clone())?;
		let mut addresses = Vec::with_capacity(self.config.inputs.len());
		for input in &self.config.inputs {
			let Some((host, port)) = table.get(input) else {
				return Err(TransportError::Other(Arc::new(std::io::Error::new(
					std::io::ErrorKind::NotFound,
					format!("node pub table is missing declared input `{input}`"),
				))));
			};
			addresses.push((input.clone(), host.clone(), *port));
		}
		return self.subscribers.arm(&addresses).await;
	}

	async fn on_request_step(&mut self) -> Result<(), TransportError> {
		let inputs = self.subscribers.snapshot().await;
		let output = self
			.node
			.step(&inputs)
			.await
			.map_err(|error| TransportError::Other(Arc::new(error)))?;

		if let Some(sample) = output {
			self.publisher.publish(sample.clone());
			*self.last_sample.lock().await = Some(sample);
		}
		return Ok(());
	}

	/// Flush the node's record sink, zip the staged directory, and upload
	/// it to this node's worker (§4.6). Reports `SAVED` on success.
	async fn on_request_collect(&mut self) -> Result<(), TransportError> {
		tokio::fs::create_dir_all(&self.config.staging_dir).await?;
		self.node
			.collect(&self.config.staging_dir)
			.await
			.map_err(|error| TransportError::Other(Arc::new(error)))?;

		let archive_path = self
			.config
			.staging_dir
			.with_file_name(format!("{}.zip", self.config.node_id));
		zip_with_retry(
			&self.config.archiver_bin,
			&self.config.staging_dir,
			&archive_path,
			self.config.zip_budget,
		)
		.await?;

		let client = reqwest::Client::new();
		post_archive(
			&client,
			&self.config.worker_file_post_url,
			&self.config.node_id.to_string(),
			&archive_path,
		)
		.await?;

		info!(node_id = %self.config.node_id, "artifact collected and uploaded");
		self.report_phase(Phase::Saved).await?;
		self.phase = Phase::Saved;
		return Ok(());
	}

	async fn on_request_method(&mut self, envelope: &MessageEnvelope) -> Result<serde_json::Value, TransportError> {
		let name = envelope
			.data
			.get("name")
			.and_then(|v| v.as_str())
			.ok_or_else(|| method_call_malformed())?;
		let params = envelope.data.get("params").cloned().unwrap_or(serde_json::Value::Null);

		return self
			.node
			.method(name, params)
			.await
			.map_err(|error| TransportError::Other(Arc::new(error)));
	}
}

/// The lifecycle [`Command`] a wire [`Signal`] corresponds to, or `None`
/// for signals that carry no phase precondition (`RequestStep`, `RequestMethod`).
fn command_for(signal: Signal) -> Option<Command> {
	match signal {
		Signal::BroadcastNodeServer => Some(Command::SetupConnections),
		Signal::StartNodes => Some(Command::Start),
		Signal::RecordNodes => Some(Command::Record),
		Signal::StopNodes => Some(Command::Stop),
		Signal::RequestCollect => Some(Command::Collect),
		Signal::RequestGather => Some(Command::Gather),
		Signal::Shutdown => Some(Command::DestroyNode),
		_ => None,
	}
}

fn method_call_malformed() -> TransportError {
	TransportError::Other(Arc::new(RunNodeError::BadParameter {
		parameter: "name".into(),
		message: "REQUEST_METHOD frame is missing its `name` field".into(),
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::collections::BTreeMap;

	struct Echo;

	#[async_trait]
	impl Node for Echo {
		async fn step(
			&mut self,
			inputs: &BTreeMap<NodeId, Option<serde_json::Value>>,
		) -> Result<Option<serde_json::Value>, RunNodeError> {
			return Ok(Some(serde_json::json!({ "seen": inputs.len() })));
		}
	}

	#[tokio::test]
	async fn step_with_no_inputs_produces_a_sample() {
		let mut node: Box<dyn Node> = Box::new(Echo);
		let inputs = BTreeMap::new();
		let out = node.step(&inputs).await.unwrap();
		assert_eq!(out, Some(serde_json::json!({ "seen": 0 })));
	}

	#[test]
	fn command_for_maps_phase_changing_signals_only() {
		assert_eq!(command_for(Signal::StartNodes), Some(Command::Start));
		assert_eq!(command_for(Signal::RecordNodes), Some(Command::Record));
		assert_eq!(command_for(Signal::RequestGather), Some(Command::Gather));
		assert_eq!(command_for(Signal::RequestStep), None);
		assert_eq!(command_for(Signal::RequestMethod), None);
	}

	#[test]
	fn a_record_targeting_an_unready_node_is_an_illegal_precondition() {
		assert!(!precondition_met(Command::Record, Phase::Connected));
		assert!(!is_idempotent_repeat(Command::Record, Phase::Connected));
	}

	#[test]
	fn a_repeated_record_on_an_already_recording_node_is_idempotent() {
		assert!(is_idempotent_repeat(Command::Record, Phase::Recording));
	}
}
