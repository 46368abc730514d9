use serde::Deserialize;
use tracing::info;

use medi_domain::progress::{self, SessionProgress};

use crate::{Error, MediService, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct ReplaceProgressRequest {
	pub condition_ids: Vec<i64>,
	pub expected_version: Option<i64>,
}

impl MediService {
	pub async fn get_progress(&self, session_id: i64) -> Result<SessionProgress> {
		self.knowledge.get_progress(session_id).await
	}

	/// Client-issued wholesale replacement. Every id must name an existing condition, and no id
	/// may repeat. Stored progress is untouched on any failure.
	pub async fn replace_progress(
		&self,
		session_id: i64,
		req: ReplaceProgressRequest,
	) -> Result<SessionProgress> {
		let duplicate_ids = progress::duplicate_ids(&req.condition_ids);

		if !duplicate_ids.is_empty() {
			return Err(Error::InvalidProgress {
				message: "Progress must not list a condition more than once.".to_string(),
				unknown_ids: Vec::new(),
				duplicate_ids,
			});
		}

		let unknown_ids = self.knowledge.missing_conditions(&req.condition_ids).await?;

		if !unknown_ids.is_empty() {
			return Err(Error::InvalidProgress {
				message: "Progress references conditions that do not exist.".to_string(),
				unknown_ids,
				duplicate_ids: Vec::new(),
			});
		}

		let version = self
			.knowledge
			.set_progress(session_id, &req.condition_ids, req.expected_version)
			.await?;

		info!(session_id, version, progress_len = req.condition_ids.len(), "Progress replaced.");

		Ok(SessionProgress { condition_ids: req.condition_ids, version })
	}
}
