use std::sync::Arc;

use tracing::{info, warn};

use medi_service::{MediService, QdrantIndex, VectorIndex};
use medi_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MediService>,
}
impl AppState {
	/// Connects storage, applies the schema, and makes sure the vector collection exists. An
	/// unreachable vector store is logged and left to `rebuild_index`.
	pub async fn new(config: medi_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let index = QdrantIndex::new(QdrantStore::new(&config.storage.qdrant)?);

		match index.ensure_collection().await {
			Ok(true) => info!(
				collection = %config.storage.qdrant.collection,
				"Created vector collection."
			),
			Ok(false) => {},
			Err(err) => warn!(error = %err, "Vector collection check failed."),
		}

		Ok(Self::from_service(MediService::new(config, db, Arc::new(index))))
	}

	pub fn from_service(service: MediService) -> Self {
		Self { service: Arc::new(service) }
	}
}
