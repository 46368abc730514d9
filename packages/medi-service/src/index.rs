use qdrant_client::{
	client::Payload,
	qdrant::{
		Condition as FilterCondition, DeletePointsBuilder, Filter, PointId, PointStruct, Query,
		QueryPointsBuilder, Range, UpsertPointsBuilder, point_id::PointIdOptions,
	},
};
use serde_json::Value;

use medi_storage::qdrant::QdrantStore;

use crate::{BoxFuture, Error, Result, VectorIndex};

/// A raw nearest-neighbor hit. The id is whatever the index stores.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredId {
	pub external_id: String,
	pub score: f32,
}

#[derive(Clone, Debug)]
pub struct IndexPoint {
	pub condition_id: i64,
	pub name: String,
	pub summary: String,
	pub vector: Vec<f32>,
}

/// Qdrant collection of condition points. Point id is the condition id.
pub struct QdrantIndex {
	pub store: QdrantStore,
}
impl QdrantIndex {
	pub fn new(store: QdrantStore) -> Self {
		Self { store }
	}

	async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredId>> {
		let search = QueryPointsBuilder::new(self.store.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.limit(k as u64)
			.with_payload(false);
		let response = self.store.client.query(search).await.map_err(unavailable)?;

		Ok(response
			.result
			.into_iter()
			.filter_map(|point| {
				let external_id = point.id.as_ref().and_then(point_id_string)?;

				Some(ScoredId { external_id, score: point.score })
			})
			.collect())
	}

	async fn upsert_points(&self, points: &[IndexPoint]) -> Result<()> {
		if points.is_empty() {
			return Ok(());
		}

		let mut qdrant_points = Vec::with_capacity(points.len());

		for point in points {
			let id = u64::try_from(point.condition_id).map_err(|_| {
				Error::invalid_request(format!("Condition id {} is negative.", point.condition_id))
			})?;
			let mut payload = Payload::new();

			payload.insert("condition_id", Value::from(point.condition_id));
			payload.insert("name", point.name.clone());
			payload.insert("summary", point.summary.clone());
			qdrant_points.push(PointStruct::new(id, point.vector.clone(), payload));
		}

		let upsert =
			UpsertPointsBuilder::new(self.store.collection.clone(), qdrant_points).wait(true);

		self.store.client.upsert_points(upsert).await.map_err(unavailable)?;

		Ok(())
	}

	async fn delete_point(&self, condition_id: i64) -> Result<()> {
		let Ok(id) = u64::try_from(condition_id) else {
			return Ok(());
		};
		let delete = DeletePointsBuilder::new(self.store.collection.clone())
			.points(vec![PointId::from(id)])
			.wait(true);

		self.store.client.delete_points(delete).await.map_err(unavailable)?;

		Ok(())
	}

	async fn retain_points(&self, keep: &[i64], up_to: i64) -> Result<()> {
		let keep_ids: Vec<PointId> = keep
			.iter()
			.filter_map(|id| u64::try_from(*id).ok())
			.map(PointId::from)
			.collect();
		let mut filter = Filter::must([FilterCondition::range(
			"condition_id",
			Range { lte: Some(up_to as f64), ..Default::default() },
		)]);

		if !keep_ids.is_empty() {
			filter.must_not = vec![FilterCondition::has_id(keep_ids)];
		}

		let delete =
			DeletePointsBuilder::new(self.store.collection.clone()).points(filter).wait(true);

		self.store.client.delete_points(delete).await.map_err(unavailable)?;

		Ok(())
	}
}
impl VectorIndex for QdrantIndex {
	fn search<'a>(&'a self, vector: &'a [f32], k: usize) -> BoxFuture<'a, Result<Vec<ScoredId>>> {
		Box::pin(self.query(vector, k))
	}

	fn upsert<'a>(&'a self, points: &'a [IndexPoint]) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.upsert_points(points))
	}

	fn delete<'a>(&'a self, condition_id: i64) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.delete_point(condition_id))
	}

	fn retain<'a>(&'a self, keep: &'a [i64], up_to: i64) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.retain_points(keep, up_to))
	}

	fn ensure_collection(&self) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move { Ok(self.store.ensure_collection().await?) })
	}
}

fn point_id_string(point_id: &PointId) -> Option<String> {
	match point_id.point_id_options.as_ref()? {
		PointIdOptions::Num(id) => Some(id.to_string()),
		PointIdOptions::Uuid(id) => Some(id.clone()),
	}
}

fn unavailable(err: qdrant_client::QdrantError) -> Error {
	Error::IndexUnavailable { message: err.to_string() }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn numeric_and_uuid_point_ids_become_strings() {
		assert_eq!(point_id_string(&PointId::from(42_u64)).as_deref(), Some("42"));
		assert_eq!(
			point_id_string(&PointId::from("8f7e3c1a-0000-4000-8000-000000000000".to_string()))
				.as_deref(),
			Some("8f7e3c1a-0000-4000-8000-000000000000")
		);
		assert_eq!(point_id_string(&PointId { point_id_options: None }), None);
	}
}
