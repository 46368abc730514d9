use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use medi_storage::conditions;

use crate::{MediService, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
	pub indexed_count: u64,
	pub skipped_count: u64,
	pub error_count: u64,
}

impl MediService {
	/// Mirrors every condition into the vector index, one batch at a time. A failed batch adds its
	/// size to `error_count` and the scan moves on. Afterwards, points left behind by deleted or
	/// unindexable conditions are removed. Conditions created during the scan are never removed.
	pub async fn rebuild_index(&self) -> Result<RebuildReport> {
		let created = self.index.ensure_collection().await?;

		if created {
			info!(
				collection = %self.cfg.storage.qdrant.collection,
				vector_dim = self.cfg.storage.qdrant.vector_dim,
				"Created vector collection."
			);
		}

		let batch_size = i64::from(self.cfg.retrieval.index_batch_size.max(1));
		let high_water = conditions::condition_id_high_water(&self.db.pool).await?;
		let mut report = RebuildReport::default();
		let mut keep = Vec::new();
		let mut after_id = 0_i64;

		loop {
			let batch = conditions::list_conditions_after(&self.db.pool, after_id, batch_size).await?;
			let Some(last) = batch.last() else {
				break;
			};

			after_id = last.id;

			let (indexable, skipped): (Vec<_>, Vec<_>) =
				batch.into_iter().partition(|condition| !condition.index_text().trim().is_empty());

			report.skipped_count += skipped.len() as u64;

			keep.extend(indexable.iter().map(|condition| condition.id));

			if indexable.is_empty() {
				continue;
			}

			match self.index_conditions(&indexable).await {
				Ok(count) => report.indexed_count += count as u64,
				Err(err) => {
					warn!(
						after_id,
						batch_len = indexable.len(),
						error = %err,
						"Failed to index condition batch."
					);

					report.error_count += indexable.len() as u64;
				},
			}
		}

		self.index.retain(&keep, high_water).await?;

		info!(
			high_water,
			kept = keep.len(),
			indexed_count = report.indexed_count,
			skipped_count = report.skipped_count,
			error_count = report.error_count,
			"Vector index rebuild finished."
		);

		Ok(report)
	}
}
