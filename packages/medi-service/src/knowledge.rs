use sqlx::PgPool;

use medi_domain::progress::SessionProgress;
use medi_storage::{
	conditions, conversations, exclusion_methods,
	models::{Condition, ExclusionMethod, LinkedTreatmentPlan},
	treatment_plans,
};

use crate::{BoxFuture, Error, KnowledgeStore, Result};

pub struct PgKnowledgeStore {
	pool: PgPool,
}
impl PgKnowledgeStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	async fn store_progress(
		&self,
		session_id: i64,
		condition_ids: &[i64],
		expected_version: Option<i64>,
	) -> Result<i64> {
		let written = conversations::write_progress(
			&self.pool,
			session_id,
			condition_ids,
			expected_version,
		)
		.await?;

		if let Some(version) = written {
			return Ok(version);
		}
		if !conversations::conversation_exists(&self.pool, session_id).await? {
			return Err(Error::not_found(format!("Conversation {session_id} does not exist.")));
		}

		let unknown_ids = conditions::missing_condition_ids(&self.pool, condition_ids).await?;

		if !unknown_ids.is_empty() {
			return Err(Error::InvalidProgress {
				message: "Progress references conditions that do not exist.".to_string(),
				unknown_ids,
				duplicate_ids: Vec::new(),
			});
		}

		Err(Error::VersionConflict { session_id })
	}
}
impl KnowledgeStore for PgKnowledgeStore {
	fn get_condition(&self, condition_id: i64) -> BoxFuture<'_, Result<Option<Condition>>> {
		Box::pin(async move { Ok(conditions::get_condition(&self.pool, condition_id).await?) })
	}

	fn exclusion_methods(&self, condition_id: i64) -> BoxFuture<'_, Result<Vec<ExclusionMethod>>> {
		Box::pin(async move {
			Ok(exclusion_methods::exclusion_methods_for_condition(&self.pool, condition_id).await?)
		})
	}

	fn treatment_plans(
		&self,
		condition_id: i64,
	) -> BoxFuture<'_, Result<Vec<LinkedTreatmentPlan>>> {
		Box::pin(async move {
			Ok(treatment_plans::treatment_plans_for_condition(&self.pool, condition_id).await?)
		})
	}

	fn get_progress(&self, session_id: i64) -> BoxFuture<'_, Result<SessionProgress>> {
		Box::pin(async move {
			let row = conversations::get_progress(&self.pool, session_id).await?.ok_or_else(|| {
				Error::not_found(format!("Conversation {session_id} does not exist."))
			})?;

			Ok(SessionProgress { condition_ids: row.progress.0, version: row.progress_version })
		})
	}

	fn set_progress<'a>(
		&'a self,
		session_id: i64,
		condition_ids: &'a [i64],
		expected_version: Option<i64>,
	) -> BoxFuture<'a, Result<i64>> {
		Box::pin(self.store_progress(session_id, condition_ids, expected_version))
	}

	fn missing_conditions<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move { Ok(conditions::missing_condition_ids(&self.pool, ids).await?) })
	}
}
