//! `/file/post`: receives a worker's forwarded artifact (§4.6).

use axum::{
	extract::{Multipart, State},
	http::StatusCode,
};
use chimera_transport::{store_staged, ArchiveMeta};
use tracing::{info, warn};

use super::RouterState;

pub async fn post(State(state): State<RouterState>, mut multipart: Multipart) -> StatusCode {
	let mut meta: Option<ArchiveMeta> = None;
	let mut file_name = String::new();
	let mut bytes = Vec::new();

	loop {
		let field = match multipart.next_field().await {
			Ok(Some(field)) => field,
			Ok(None) => break,
			Err(error) => {
				warn!(%error, "malformed multipart upload");
				return StatusCode::BAD_REQUEST;
			}
		};

		match field.name() {
			Some("meta") => {
				let Ok(text) = field.text().await else {
					return StatusCode::BAD_REQUEST;
				};
				meta = serde_json::from_str(&text).ok();
			}
			Some("file") => {
				file_name = field.file_name().unwrap_or("archive.zip").to_string();
				let Ok(data) = field.bytes().await else {
					return StatusCode::BAD_REQUEST;
				};
				bytes = data.to_vec();
			}
			_ => {}
		}
	}

	let Some(meta) = meta else {
		return StatusCode::BAD_REQUEST;
	};

	match store_staged(state.handler.staging_root(), &meta, &file_name, &bytes).await {
		Ok(path) => {
			info!(sender_id = meta.sender_id, ?path, "artifact staged");
			StatusCode::OK
		}
		Err(error) => {
			warn!(%error, sender_id = meta.sender_id, "failed to store artifact");
			StatusCode::INTERNAL_SERVER_ERROR
		}
	}
}
