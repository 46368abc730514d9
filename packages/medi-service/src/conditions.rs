use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use medi_storage::{
	conditions::{self, ConditionPatch, NewCondition},
	exclusion_methods, treatment_plans,
	models::{Condition, ExclusionMethod, LinkedTreatmentPlan},
};

use crate::{Error, IndexPoint, ListResponse, MediService, PageRequest, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateConditionRequest {
	pub name: String,
	pub full_description: Option<String>,
	#[serde(default)]
	pub summary: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateConditionRequest {
	pub name: Option<String>,
	pub full_description: Option<String>,
	pub summary: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConditionDetail {
	#[serde(flatten)]
	pub condition: Condition,
	pub exclusion_methods: Vec<ExclusionMethod>,
	pub treatment_plans: Vec<LinkedTreatmentPlan>,
}

impl MediService {
	pub async fn create_condition(&self, req: CreateConditionRequest) -> Result<Condition> {
		crate::require_text("name", &req.name)?;
		self.check_summary(&req.summary)?;

		let condition = conditions::insert_condition(
			&self.db.pool,
			&NewCondition {
				name: req.name.trim(),
				full_description: req.full_description.as_deref(),
				summary: req.summary.trim(),
			},
		)
		.await?;

		self.sync_condition_index(&condition).await;

		Ok(condition)
	}

	pub async fn get_condition(&self, condition_id: i64) -> Result<ConditionDetail> {
		let condition = self.require_condition(condition_id).await?;
		let (exclusion_methods, treatment_plans) = tokio::try_join!(
			exclusion_methods::exclusion_methods_for_condition(&self.db.pool, condition_id),
			treatment_plans::treatment_plans_for_condition(&self.db.pool, condition_id),
		)?;

		Ok(ConditionDetail { condition, exclusion_methods, treatment_plans })
	}

	pub async fn list_conditions(&self, req: PageRequest) -> Result<ListResponse<Condition>> {
		let page = self.page(&req)?;
		let (total, items) = tokio::try_join!(
			conditions::count_conditions(&self.db.pool),
			conditions::list_conditions(&self.db.pool, page),
		)?;

		Ok(ListResponse { total, items })
	}

	pub async fn update_condition(
		&self,
		condition_id: i64,
		req: UpdateConditionRequest,
	) -> Result<Condition> {
		if let Some(name) = req.name.as_deref() {
			crate::require_text("name", name)?;
		}
		if let Some(summary) = req.summary.as_deref() {
			self.check_summary(summary)?;
		}

		let reindex = req.name.is_some() || req.summary.is_some();
		let condition = conditions::update_condition(
			&self.db.pool,
			condition_id,
			&ConditionPatch {
				name: req.name.as_deref().map(str::trim),
				full_description: req.full_description.as_deref(),
				summary: req.summary.as_deref().map(str::trim),
			},
		)
		.await?
		.ok_or_else(|| condition_not_found(condition_id))?;

		if reindex {
			self.sync_condition_index(&condition).await;
		}

		Ok(condition)
	}

	/// Removes the condition, its associations, and its id from every conversation progress.
	pub async fn delete_condition(&self, condition_id: i64) -> Result<()> {
		let touched = conditions::delete_condition(&self.db.pool, condition_id)
			.await?
			.ok_or_else(|| condition_not_found(condition_id))?;

		if !touched.is_empty() {
			info!(
				condition_id,
				conversation_count = touched.len(),
				"Stripped deleted condition from conversation progress."
			);
		}
		if let Err(err) = self.index.delete(condition_id).await {
			warn!(condition_id, error = %err, "Failed to delete condition from vector index.");
		}

		Ok(())
	}

	pub(crate) async fn require_condition(&self, condition_id: i64) -> Result<Condition> {
		conditions::get_condition(&self.db.pool, condition_id)
			.await?
			.ok_or_else(|| condition_not_found(condition_id))
	}

	fn check_summary(&self, summary: &str) -> Result<()> {
		let max = self.cfg.knowledge.summary_max_chars as usize;

		if summary.trim().chars().count() > max {
			return Err(Error::invalid_request(format!("summary must be at most {max} characters.")));
		}

		Ok(())
	}

	/// Index failures are logged; the relational write stands and a rebuild repairs the index.
	async fn sync_condition_index(&self, condition: &Condition) {
		if let Err(err) = self.index_conditions(std::slice::from_ref(condition)).await {
			warn!(
				condition_id = condition.id,
				error = %err,
				"Failed to sync condition into vector index."
			);
		}
	}

	pub(crate) async fn index_conditions(&self, conditions: &[Condition]) -> Result<usize> {
		let texts: Vec<String> =
			conditions.iter().map(|condition| condition.index_text().to_string()).collect();
		let vectors = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &texts)
			.await
			.map_err(|err| Error::EmbeddingUnavailable { message: err.to_string() })?;
		let expected = self.cfg.storage.qdrant.vector_dim as usize;

		if vectors.len() != conditions.len() || vectors.iter().any(|vec| vec.len() != expected) {
			return Err(Error::EmbeddingUnavailable {
				message: "Embedding batch does not match the configured shape.".to_string(),
			});
		}

		let points: Vec<IndexPoint> = conditions
			.iter()
			.zip(vectors)
			.map(|(condition, vector)| IndexPoint {
				condition_id: condition.id,
				name: condition.name.clone(),
				summary: condition.summary.clone(),
				vector,
			})
			.collect();

		self.index.upsert(&points).await?;

		Ok(points.len())
	}
}

pub(crate) fn condition_not_found(condition_id: i64) -> Error {
	Error::not_found(format!("Condition {condition_id} does not exist."))
}
