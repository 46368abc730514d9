use std::time::Duration;

use serde::Deserialize;
use tokio::time;
use tracing::warn;

use medi_config::Config;
use medi_domain::ranking::{self, Candidate};

use crate::{EmbeddingProvider, Error, Result, VectorIndex};

#[derive(Clone, Debug, Deserialize)]
pub struct RetrieveRequest {
	pub query_text: String,
	pub top_k: Option<i64>,
	pub similarity_threshold: Option<f32>,
}

/// Embeds a query, searches the vector index, and filters by similarity.
pub struct Retriever<'a> {
	pub cfg: &'a Config,
	pub embedding: &'a dyn EmbeddingProvider,
	pub index: &'a dyn VectorIndex,
}
impl Retriever<'_> {
	/// Returns candidates ordered by score descending, ids ascending on ties. An empty result is
	/// a normal outcome.
	pub async fn retrieve(&self, req: &RetrieveRequest) -> Result<Vec<Candidate>> {
		let retrieval = &self.cfg.retrieval;
		let query = req.query_text.trim();
		let top_k = req.top_k.unwrap_or(i64::from(retrieval.top_k));
		let threshold = req.similarity_threshold.unwrap_or(retrieval.similarity_threshold);

		if query.is_empty() {
			return Err(Error::invalid_query("query_text must be non-empty."));
		}
		if query.chars().count() > retrieval.max_query_chars as usize {
			return Err(Error::invalid_query(format!(
				"query_text must be at most {} characters.",
				retrieval.max_query_chars
			)));
		}
		if top_k <= 0 {
			return Err(Error::invalid_query("top_k must be greater than zero."));
		}
		if top_k > i64::from(retrieval.max_top_k) {
			return Err(Error::invalid_query(format!(
				"top_k must be at most {}.",
				retrieval.max_top_k
			)));
		}
		if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
			return Err(Error::invalid_query("similarity_threshold must be within 0.0-1.0."));
		}

		let top_k = top_k as usize;
		let vector = self.embed_query(query).await?;
		let hits = self.search(&vector, top_k).await?;
		let parsed = hits.into_iter().filter_map(|hit| match hit.external_id.parse::<i64>() {
			Ok(condition_id) => Some(Candidate { condition_id, score: hit.score }),
			Err(_) => {
				warn!(external_id = %hit.external_id, "Dropping vector hit with a non-condition id.");

				None
			},
		});

		Ok(ranking::rank_candidates(parsed, threshold, top_k))
	}

	/// One embedding call under `upstream_timeout_ms`, checked against the configured dimension.
	pub(crate) async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
		let timeout_ms = self.cfg.retrieval.upstream_timeout_ms;
		let texts = vec![query.to_string()];
		let embedded = time::timeout(
			Duration::from_millis(timeout_ms),
			self.embedding.embed(&self.cfg.providers.embedding, &texts),
		)
		.await
		.map_err(|_| Error::UpstreamTimeout { stage: "embedding", timeout_ms })?;
		let vectors = match embedded {
			Ok(vectors) => vectors,
			Err(err) if err.is_timeout() =>
				return Err(Error::UpstreamTimeout { stage: "embedding", timeout_ms }),
			Err(err) => return Err(Error::EmbeddingUnavailable { message: err.to_string() }),
		};
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::EmbeddingUnavailable {
				message: "Embedding provider returned no vector.".to_string(),
			});
		};
		let expected = self.cfg.storage.qdrant.vector_dim as usize;

		if vector.len() != expected {
			return Err(Error::EmbeddingUnavailable {
				message: format!(
					"Embedding dimension {} does not match the configured {expected}.",
					vector.len()
				),
			});
		}

		Ok(vector)
	}

	async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<crate::ScoredId>> {
		let timeout_ms = self.cfg.retrieval.upstream_timeout_ms;

		time::timeout(Duration::from_millis(timeout_ms), self.index.search(vector, top_k))
			.await
			.map_err(|_| Error::UpstreamTimeout { stage: "vector search", timeout_ms })?
	}
}
