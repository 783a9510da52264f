//! Archive-and-transfer of a node's output directory (§4.6).
//!
//! Zipping happens in an isolated OS process (the `archiver` binary) so
//! that a slow or failing archive run cannot block the event loop it was
//! requested from; this function owns the exponential-ish retry budget
//! described in §6 (`comms.timeout.zip-time`).

use crate::TransportError;
use rand::Rng;
use reqwest::multipart;
use std::{
	path::{Path, PathBuf},
	time::{Duration, Instant},
};
use tokio::process::Command;
use tracing::{debug, warn};

/// Zip `source_dir` into `dest_zip` by shelling out to the `archiver`
/// binary, retrying with increasing backoff until `zip_budget` is
/// exhausted. Returns [`TransportError::ArchiveError`] on exhaustion
/// (§8 S6): this failure is confined to the one archive, never the caller.
pub async fn zip_with_retry(
	archiver_bin: &Path,
	source_dir: &Path,
	dest_zip: &Path,
	zip_budget: Duration,
) -> Result<(), TransportError> {
	let deadline = Instant::now() + zip_budget;
	let mut attempt: u32 = 0;

	loop {
		attempt += 1;
		let output = Command::new(archiver_bin)
			.arg(source_dir)
			.arg(dest_zip)
			.output()
			.await?;

		if output.status.success() {
			return Ok(());
		}

		warn!(
			attempt,
			status = ?output.status,
			"archiver process failed, will retry if budget allows"
		);

		if Instant::now() >= deadline {
			return Err(TransportError::ArchiveError);
		}

		let jitter_ms = rand::thread_rng().gen_range(0..250);
		let delay = Duration::from_millis(u64::from(attempt.min(8)) * 500 + jitter_ms);
		let remaining = deadline.saturating_duration_since(Instant::now());
		if remaining.is_zero() {
			return Err(TransportError::ArchiveError);
		}
		tokio::time::sleep(delay.min(remaining)).await;
	}
}

/// POST `archive_path` as a multipart form: a JSON `meta` part
/// `{sender_id, size}` and a binary `file` part (§4.6, §6 `/file/post`).
pub async fn post_archive(
	client: &reqwest::Client,
	url: &str,
	sender_id: &str,
	archive_path: &Path,
) -> Result<(), TransportError> {
	let bytes = tokio::fs::read(archive_path).await?;
	let size = bytes.len();
	let file_name = archive_path
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| "archive.zip".into());

	let meta = serde_json::json!({ "sender_id": sender_id, "size": size });
	let form = multipart::Form::new()
		.text("meta", meta.to_string())
		.part("file", multipart::Part::bytes(bytes).file_name(file_name));

	let response = client.post(url).multipart(form).send().await?;
	if !response.status().is_success() {
		return Err(TransportError::ConnectionLost);
	}
	debug!(sender_id, %url, "archive uploaded");
	return Ok(());
}

/// The metadata part of an incoming `/file/post` multipart request.
#[derive(Debug, serde::Deserialize)]
pub struct ArchiveMeta {
	pub sender_id: String,
	pub size: usize,
}

/// Store `bytes` under `<staging_root>/<sender_id>/<file_name>`,
/// validating the declared size against what was actually received.
pub async fn store_staged(
	staging_root: &Path,
	meta: &ArchiveMeta,
	file_name: &str,
	bytes: &[u8],
) -> Result<PathBuf, TransportError> {
	if bytes.len() != meta.size {
		return Err(TransportError::ConnectionLost);
	}

	let dir = staging_root.join(&meta.sender_id);
	tokio::fs::create_dir_all(&dir).await?;
	let path = dir.join(file_name);
	tokio::fs::write(&path, bytes).await?;
	return Ok(path);
}
