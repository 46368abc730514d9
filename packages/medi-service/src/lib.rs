pub mod admin;
pub mod aggregate;
pub mod conditions;
pub mod consult;
pub mod conversations;
pub mod embedding;
pub mod exclusion_methods;
pub mod index;
pub mod knowledge;
pub mod messages;
pub mod progress;
pub mod retrieve;
pub mod sympgan;
pub mod treatment_plans;

mod error;

pub use admin::RebuildReport;
pub use aggregate::{
	AggregationWarning, Aggregator, DiagnosisItem, DiagnosisResult, WarningCode,
};
pub use consult::{ConsultRequest, ConsultResponse, SearchHit, SearchRequest, SearchResponse};
pub use embedding::{EmbedRequest, EmbedResponse};
pub use error::{Error, Result};
pub use index::{IndexPoint, QdrantIndex, ScoredId};
pub use knowledge::PgKnowledgeStore;
pub use progress::ReplaceProgressRequest;
pub use retrieve::{RetrieveRequest, Retriever};

use std::{future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};

use medi_config::{Config, EmbeddingProviderConfig};
use medi_domain::progress::SessionProgress;
use medi_storage::{
	Page,
	db::Db,
	models::{Condition, ExclusionMethod, LinkedTreatmentPlan},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, medi_providers::Result<Vec<Vec<f32>>>>;
}

/// Nearest-neighbor view over condition embeddings.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	/// Returns up to `k` hits ordered by similarity.
	fn search<'a>(&'a self, vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<ScoredId>>>;

	fn upsert<'a>(&'a self, points: &'a [IndexPoint]) -> BoxFuture<'a, Result<()>>;

	fn delete<'a>(&'a self, condition_id: i64) -> BoxFuture<'a, Result<()>>;

	/// Deletes every point with a condition id of at most `up_to` that is not listed in `keep`.
	fn retain<'a>(&'a self, keep: &'a [i64], up_to: i64) -> BoxFuture<'a, Result<()>>;

	/// Creates the backing collection if needed. Returns whether it was created.
	fn ensure_collection(&self) -> BoxFuture<'_, Result<bool>>;
}

/// Relational reads and the versioned progress contract used by the consultation pipeline.
pub trait KnowledgeStore
where
	Self: Send + Sync,
{
	fn get_condition(&self, condition_id: i64) -> BoxFuture<'_, Result<Option<Condition>>>;

	fn exclusion_methods(&self, condition_id: i64) -> BoxFuture<'_, Result<Vec<ExclusionMethod>>>;

	fn treatment_plans(&self, condition_id: i64)
	-> BoxFuture<'_, Result<Vec<LinkedTreatmentPlan>>>;

	/// Fails with `NotFound` for an unknown session.
	fn get_progress(&self, session_id: i64) -> BoxFuture<'_, Result<SessionProgress>>;

	/// Stores `condition_ids` and returns the new version. With `expected_version`, a stale value
	/// fails with `VersionConflict` and nothing is written. An id whose condition is gone at write
	/// time fails with `InvalidProgress`, also without writing.
	fn set_progress<'a>(
		&'a self,
		session_id: i64,
		condition_ids: &'a [i64],
		expected_version: Option<i64>,
	) -> BoxFuture<'a, Result<i64>>;

	/// Returns the ids that have no condition row, in input order.
	fn missing_conditions<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<i64>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

pub struct MediService {
	pub cfg: Config,
	pub db: Db,
	pub knowledge: Arc<dyn KnowledgeStore>,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
}
impl MediService {
	/// Production wiring: Postgres-backed knowledge store and the given vector index.
	pub fn new(cfg: Config, db: Db, index: Arc<dyn VectorIndex>) -> Self {
		let knowledge = Arc::new(PgKnowledgeStore::new(db.pool.clone()));

		Self::with_parts(cfg, db, knowledge, index, Providers::default())
	}

	pub fn with_parts(
		cfg: Config,
		db: Db,
		knowledge: Arc<dyn KnowledgeStore>,
		index: Arc<dyn VectorIndex>,
		providers: Providers,
	) -> Self {
		Self { cfg, db, knowledge, index, providers }
	}

	pub fn retriever(&self) -> Retriever<'_> {
		Retriever {
			cfg: &self.cfg,
			embedding: self.providers.embedding.as_ref(),
			index: self.index.as_ref(),
		}
	}

	pub fn aggregator(&self) -> Aggregator<'_> {
		Aggregator { knowledge: self.knowledge.as_ref() }
	}

	pub(crate) fn page(&self, request: &PageRequest) -> Result<Page> {
		let skip = request.skip.unwrap_or(0);
		let limit = request.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

		if skip < 0 {
			return Err(Error::invalid_request("skip must be zero or greater."));
		}
		if limit < 1 {
			return Err(Error::invalid_request("limit must be at least 1."));
		}

		Ok(Page { skip, limit: limit.min(i64::from(self.cfg.knowledge.page_limit_max)) })
	}
}

pub const DEFAULT_PAGE_LIMIT: i64 = 100;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PageRequest {
	pub skip: Option<i64>,
	pub limit: Option<i64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ListResponse<T> {
	pub total: i64,
	pub items: Vec<T>,
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, medi_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(medi_providers::embedding::embed(cfg, texts))
	}
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(Error::invalid_request(format!("{field} must be non-empty.")));
	}

	Ok(())
}
