use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AggregationWarning, DiagnosisItem, Error, MediService, Result, RetrieveRequest};

#[derive(Clone, Debug, Deserialize)]
pub struct ConsultRequest {
	pub query_text: String,
	pub top_k: Option<i64>,
	pub similarity_threshold: Option<f32>,
	pub session_id: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConsultResponse {
	pub results: Vec<DiagnosisItem>,
	pub updated_progress: Vec<i64>,
	pub progress_version: i64,
	pub warnings: Vec<AggregationWarning>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SearchRequest {
	pub query_text: String,
	pub top_k: Option<i64>,
	pub similarity_threshold: Option<f32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchHit {
	pub condition_id: i64,
	pub score: f32,
	/// `None` when the name lookup failed.
	pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub items: Vec<SearchHit>,
}

impl MediService {
	/// One consultation turn: retrieve, expand, merge into the session, and persist the merge
	/// with a version check.
	pub async fn consult(&self, req: ConsultRequest) -> Result<ConsultResponse> {
		let retrieve = RetrieveRequest {
			query_text: req.query_text,
			top_k: req.top_k,
			similarity_threshold: req.similarity_threshold,
		};
		let retriever = self.retriever();
		let (stored, candidates) = tokio::try_join!(
			self.knowledge.get_progress(req.session_id),
			retriever.retrieve(&retrieve),
		)?;
		let diagnosis = self
			.aggregator()
			.aggregate(
				&candidates,
				&stored.condition_ids,
				self.cfg.retrieval.expand_limit as usize,
			)
			.await;
		let progress_version = if diagnosis.progress == stored.condition_ids {
			stored.version
		} else {
			self.knowledge
				.set_progress(req.session_id, &diagnosis.progress, Some(stored.version))
				.await
				.map_err(|err| match err {
					// A surfaced condition was deleted mid-turn. The turn has to be rerun.
					Error::InvalidProgress { .. } =>
						Error::VersionConflict { session_id: req.session_id },
					err => err,
				})?
		};

		info!(
			session_id = req.session_id,
			candidate_count = candidates.len(),
			result_count = diagnosis.results.len(),
			progress_len = diagnosis.progress.len(),
			progress_version,
			"Consultation turn completed."
		);

		Ok(ConsultResponse {
			results: diagnosis.results,
			updated_progress: diagnosis.progress,
			progress_version,
			warnings: diagnosis.warnings,
		})
	}

	/// Sessionless semantic search over conditions. Hits without a condition row are dropped.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let candidates = self
			.retriever()
			.retrieve(&RetrieveRequest {
				query_text: req.query_text,
				top_k: req.top_k,
				similarity_threshold: req.similarity_threshold,
			})
			.await?;
		let names = futures::future::join_all(
			candidates.iter().map(|candidate| self.knowledge.get_condition(candidate.condition_id)),
		)
		.await;
		let mut items = Vec::with_capacity(candidates.len());

		for (candidate, condition) in candidates.iter().zip(names) {
			let name = match condition {
				Ok(Some(condition)) => Some(condition.name),
				Ok(None) => {
					warn!(
						condition_id = candidate.condition_id,
						"Dropping search hit for a condition that does not exist."
					);

					continue;
				},
				Err(err) => {
					warn!(
						condition_id = candidate.condition_id,
						error = %err,
						"Condition name lookup failed during search."
					);

					None
				},
			};

			items.push(SearchHit {
				condition_id: candidate.condition_id,
				score: candidate.score,
				name,
			});
		}

		Ok(SearchResponse { items })
	}
}
