use std::collections::HashSet;

use futures::future;
use serde::Serialize;
use tracing::warn;

use medi_domain::{
	progress,
	ranking::{self, Candidate},
	treatment::{self, PlanRank},
};
use medi_storage::models::{Condition, ExclusionMethod, LinkedTreatmentPlan};

use crate::KnowledgeStore;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
	/// The vector index returned an id with no condition row. The candidate is skipped.
	ConditionMissing,
	/// The condition lookup failed. The candidate is skipped.
	ConditionUnavailable,
	/// The condition loaded but one of its expansions failed and is returned empty.
	ExpansionPartial,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregationWarning {
	pub code: WarningCode,
	pub condition_id: i64,
	pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct DiagnosisItem {
	pub condition_id: i64,
	pub score: f32,
	pub previously_surfaced: bool,
	pub condition: Condition,
	pub exclusion_methods: Vec<ExclusionMethod>,
	pub treatment_plans: Vec<LinkedTreatmentPlan>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DiagnosisResult {
	/// Ordered by this turn's score descending.
	pub results: Vec<DiagnosisItem>,
	/// Merged progress to persist.
	pub progress: Vec<i64>,
	pub warnings: Vec<AggregationWarning>,
}

pub struct Aggregator<'a> {
	pub knowledge: &'a dyn KnowledgeStore,
}
impl Aggregator<'_> {
	/// Expands candidates with their exclusion methods and treatment plans, and merges the
	/// surviving ids into `prior`. Per-candidate failures become warnings.
	pub async fn aggregate(
		&self,
		candidates: &[Candidate],
		prior: &[i64],
		expand_limit: usize,
	) -> DiagnosisResult {
		let mut ordered = candidates.to_vec();
		let mut seen = HashSet::with_capacity(ordered.len());

		ordered.sort_by(ranking::cmp_by_score);
		ordered.retain(|candidate| seen.insert(candidate.condition_id));

		let expansions = future::join_all(
			ordered.iter().map(|candidate| self.expand(candidate.condition_id, expand_limit)),
		)
		.await;
		let prior_ids: HashSet<i64> = prior.iter().copied().collect();
		let mut results = Vec::with_capacity(ordered.len());
		let mut warnings = Vec::new();

		for (candidate, expansion) in ordered.iter().zip(expansions) {
			warnings.extend(expansion.warnings);

			let Some(loaded) = expansion.loaded else {
				continue;
			};

			results.push(DiagnosisItem {
				condition_id: candidate.condition_id,
				score: candidate.score,
				previously_surfaced: prior_ids.contains(&candidate.condition_id),
				condition: loaded.condition,
				exclusion_methods: loaded.exclusion_methods,
				treatment_plans: loaded.treatment_plans,
			});
		}

		for warning in &warnings {
			warn!(
				code = ?warning.code,
				condition_id = warning.condition_id,
				message = %warning.message,
				"Consultation candidate degraded."
			);
		}

		let surfaced: Vec<Candidate> = results
			.iter()
			.map(|item| Candidate { condition_id: item.condition_id, score: item.score })
			.collect();
		let progress = progress::merge_progress(prior, &surfaced);

		DiagnosisResult { results, progress, warnings }
	}

	async fn expand(&self, condition_id: i64, expand_limit: usize) -> Expansion {
		let condition = match self.knowledge.get_condition(condition_id).await {
			Ok(Some(condition)) => condition,
			Ok(None) =>
				return Expansion::skipped(AggregationWarning {
					code: WarningCode::ConditionMissing,
					condition_id,
					message: "Vector index references a condition that does not exist.".to_string(),
				}),
			Err(err) =>
				return Expansion::skipped(AggregationWarning {
					code: WarningCode::ConditionUnavailable,
					condition_id,
					message: format!("Condition lookup failed: {err}"),
				}),
		};
		let (methods, plans) = tokio::join!(
			self.knowledge.exclusion_methods(condition_id),
			self.knowledge.treatment_plans(condition_id),
		);
		let mut warnings = Vec::new();
		let exclusion_methods = match methods {
			Ok(mut methods) => {
				methods.truncate(expand_limit);

				methods
			},
			Err(err) => {
				warnings.push(AggregationWarning {
					code: WarningCode::ExpansionPartial,
					condition_id,
					message: format!("Exclusion method lookup failed: {err}"),
				});

				Vec::new()
			},
		};
		let treatment_plans = match plans {
			Ok(plans) => treatment::order_treatment_plans(plans, expand_limit, plan_rank),
			Err(err) => {
				warnings.push(AggregationWarning {
					code: WarningCode::ExpansionPartial,
					condition_id,
					message: format!("Treatment plan lookup failed: {err}"),
				});

				Vec::new()
			},
		};

		Expansion {
			loaded: Some(Loaded { condition, exclusion_methods, treatment_plans }),
			warnings,
		}
	}
}

struct Loaded {
	condition: Condition,
	exclusion_methods: Vec<ExclusionMethod>,
	treatment_plans: Vec<LinkedTreatmentPlan>,
}

struct Expansion {
	loaded: Option<Loaded>,
	warnings: Vec<AggregationWarning>,
}
impl Expansion {
	fn skipped(warning: AggregationWarning) -> Self {
		Self { loaded: None, warnings: vec![warning] }
	}
}

fn plan_rank(plan: &LinkedTreatmentPlan) -> PlanRank {
	PlanRank {
		association_id: plan.association_id,
		is_primary: plan.is_primary,
		priority: plan.priority,
	}
}
