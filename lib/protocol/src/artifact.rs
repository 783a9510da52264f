//! Collected output artifacts (§4.6, §3 `ArtifactBundle`).

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// A node's staged output directory, and — once zipped for transfer — the
/// archive path it was sent as.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArtifactBundle {
	pub node_id: NodeId,
	pub staged_dir: PathBuf,
	pub archive_name: String,
}

impl ArtifactBundle {
	pub fn new(node_id: NodeId, staged_dir: PathBuf) -> Self {
		let archive_name = format!("{node_id}.zip");
		Self {
			node_id,
			staged_dir,
			archive_name,
		}
	}

	/// Where this bundle's archive lives once staged at a receiver,
	/// per §6's `staging/<sender_id>/<archive-name>` layout.
	pub fn staged_path(&self, staging_root: &std::path::Path, sender_id: &str) -> PathBuf {
		staging_root.join(sender_id).join(&self.archive_name)
	}
}
