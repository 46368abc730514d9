use std::{
	collections::BTreeSet,
	sync::{Arc, Mutex},
	time::Duration,
};

use serde_json::Map;

use medi_config::{
	Config, EmbeddingProviderConfig, Knowledge, Postgres, Providers as ProviderSettings, Qdrant,
	Retrieval, Security, Service, Storage,
};
use medi_service::{
	BoxFuture, EmbeddingProvider, Error, IndexPoint, KnowledgeStore, MediService,
	PgKnowledgeStore, Providers, ReplaceProgressRequest, Result, ScoredId, VectorIndex,
	conditions::CreateConditionRequest,
	conversations::CreateConversationRequest,
	treatment_plans::{CreateTreatmentPlanRequest, LinkTreatmentPlanRequest},
};
use medi_storage::{conditions, db::Db};
use medi_testkit::TestDatabase;

const DIM: usize = 3;

fn test_config(dsn: String) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: Postgres { dsn, pool_max_conns: 2 },
			qdrant: Qdrant {
				url: "http://127.0.0.1:1".to_string(),
				collection: "medi_test".to_string(),
				vector_dim: DIM as u32,
				api_key: None,
			},
		},
		providers: ProviderSettings {
			embedding: EmbeddingProviderConfig {
				provider_id: "fake".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "fake-embedding".to_string(),
				dimensions: DIM as u32,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		retrieval: Retrieval { index_batch_size: 2, ..Retrieval::default() },
		knowledge: Knowledge::default(),
		security: Security {
			bind_localhost_only: true,
			api_auth_token: None,
			admin_auth_token: None,
		},
	}
}

struct ConstantEmbedding;
impl EmbeddingProvider for ConstantEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, medi_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(texts.iter().map(|_| vec![0.1; DIM]).collect()) })
	}
}

/// Records calls and keeps the set of ids a real collection would hold.
#[derive(Default)]
struct RecordingIndex {
	points: Mutex<Vec<i64>>,
	deleted: Mutex<Vec<i64>>,
	stored: Mutex<BTreeSet<i64>>,
}
impl VectorIndex for RecordingIndex {
	fn search<'a>(&'a self, _vector: &'a [f32], _k: usize) -> BoxFuture<'a, Result<Vec<ScoredId>>> {
		Box::pin(async { Ok(Vec::new()) })
	}

	fn upsert<'a>(&'a self, points: &'a [IndexPoint]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.points.lock().unwrap().extend(points.iter().map(|point| point.condition_id));
			self.stored.lock().unwrap().extend(points.iter().map(|point| point.condition_id));

			Ok(())
		})
	}

	fn delete<'a>(&'a self, condition_id: i64) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.deleted.lock().unwrap().push(condition_id);
			self.stored.lock().unwrap().remove(&condition_id);

			Ok(())
		})
	}

	fn retain<'a>(&'a self, keep: &'a [i64], up_to: i64) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.stored.lock().unwrap().retain(|id| *id > up_to || keep.contains(id));

			Ok(())
		})
	}

	fn ensure_collection(&self) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async { Ok(true) })
	}
}

async fn build_service(test_db: &TestDatabase, index: Arc<RecordingIndex>) -> MediService {
	let cfg = test_config(test_db.dsn().to_string());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let knowledge = Arc::new(PgKnowledgeStore::new(db.pool.clone()));

	MediService::with_parts(
		cfg,
		db,
		knowledge,
		index,
		Providers { embedding: Arc::new(ConstantEmbedding) },
	)
}

async fn create_condition(service: &MediService, name: &str) -> i64 {
	service
		.create_condition(CreateConditionRequest {
			name: name.to_string(),
			full_description: None,
			summary: format!("{name} summary"),
		})
		.await
		.expect("Failed to create condition.")
		.id
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDI_PG_DSN to run."]
async fn progress_contract_against_postgres() {
	let Some(base_dsn) = medi_testkit::env_dsn() else {
		eprintln!("Skipping progress_contract_against_postgres; set MEDI_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = build_service(&test_db, Arc::new(RecordingIndex::default())).await;
	let flu = create_condition(&service, "Influenza").await;
	let cold = create_condition(&service, "Common cold").await;
	let session = service
		.create_conversation(CreateConversationRequest {
			title: "Fever follow-up".to_string(),
			department: Some("general".to_string()),
			patient_id: None,
			user_id: None,
		})
		.await
		.expect("Failed to create conversation.");
	let unknown = service
		.replace_progress(
			session.id,
			ReplaceProgressRequest { condition_ids: vec![flu, 999_999], expected_version: None },
		)
		.await
		.expect_err("Expected invalid progress.");

	assert!(matches!(unknown, Error::InvalidProgress { .. }));
	assert!(service.get_progress(session.id).await.expect("Failed to load progress.").is_empty());

	let first = service
		.replace_progress(
			session.id,
			ReplaceProgressRequest { condition_ids: vec![cold, flu], expected_version: Some(0) },
		)
		.await
		.expect("Failed to replace progress.");

	assert_eq!(first.version, 1);

	let stale = service
		.replace_progress(
			session.id,
			ReplaceProgressRequest { condition_ids: vec![flu], expected_version: Some(0) },
		)
		.await
		.expect_err("Expected version conflict.");

	assert!(matches!(stale, Error::VersionConflict { .. }));

	service.delete_condition(cold).await.expect("Failed to delete condition.");

	let stripped = service.get_progress(session.id).await.expect("Failed to load progress.");

	assert_eq!(stripped.condition_ids, vec![flu]);
	assert_eq!(stripped.version, 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDI_PG_DSN to run."]
async fn rebuild_index_covers_every_condition() {
	let Some(base_dsn) = medi_testkit::env_dsn() else {
		eprintln!("Skipping rebuild_index_covers_every_condition; set MEDI_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let index = Arc::new(RecordingIndex::default());
	let service = build_service(&test_db, index.clone()).await;
	let mut ids = Vec::new();

	for name in ["Asthma", "Bronchitis", "Pneumonia", "Sinusitis", "Tonsillitis"] {
		ids.push(create_condition(&service, name).await);
	}

	index.points.lock().unwrap().clear();

	let report = service.rebuild_index().await.expect("Rebuild failed.");

	assert_eq!(report.indexed_count, 5);
	assert_eq!(report.skipped_count, 0);
	assert_eq!(report.error_count, 0);
	assert_eq!(*index.points.lock().unwrap(), ids);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDI_PG_DSN to run."]
async fn progress_write_never_stores_deleted_conditions() {
	let Some(base_dsn) = medi_testkit::env_dsn() else {
		eprintln!("Skipping progress_write_never_stores_deleted_conditions; set MEDI_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = Arc::new(build_service(&test_db, Arc::new(RecordingIndex::default())).await);
	let flu = create_condition(&service, "Influenza").await;
	let cold = create_condition(&service, "Common cold").await;
	let session = service
		.create_conversation(CreateConversationRequest {
			title: "Cough review".to_string(),
			department: None,
			patient_id: None,
			user_id: None,
		})
		.await
		.expect("Failed to create conversation.");

	// A delete that is still uncommitted when the replacement starts.
	let mut tx = service.db.pool.begin().await.expect("Failed to begin transaction.");

	sqlx::query("DELETE FROM conditions WHERE id = $1")
		.bind(flu)
		.execute(&mut *tx)
		.await
		.expect("Failed to delete condition.");

	let replacing = {
		let service = service.clone();

		tokio::spawn(async move {
			service
				.replace_progress(
					session.id,
					ReplaceProgressRequest { condition_ids: vec![flu], expected_version: Some(0) },
				)
				.await
		})
	};

	tokio::time::sleep(Duration::from_millis(200)).await;
	tx.commit().await.expect("Failed to commit delete.");

	let err = replacing
		.await
		.expect("Replacement task panicked.")
		.expect_err("Expected invalid progress.");

	match err {
		Error::InvalidProgress { unknown_ids, .. } => assert_eq!(unknown_ids, vec![flu]),
		other => panic!("Unexpected error: {other:?}"),
	}

	let progress = service.get_progress(session.id).await.expect("Failed to load progress.");

	assert!(progress.is_empty());
	assert_eq!(progress.version, 0);

	// The write itself is guarded, not only the validation in front of it.
	let err = service
		.knowledge
		.set_progress(session.id, &[cold, flu], Some(0))
		.await
		.expect_err("Expected invalid progress.");

	assert!(matches!(err, Error::InvalidProgress { .. }));

	let version = service
		.knowledge
		.set_progress(session.id, &[cold], Some(0))
		.await
		.expect("Failed to set progress.");

	assert_eq!(version, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDI_PG_DSN to run."]
async fn rebuild_index_prunes_points_of_deleted_conditions() {
	let Some(base_dsn) = medi_testkit::env_dsn() else {
		eprintln!("Skipping rebuild_index_prunes_points_of_deleted_conditions; set MEDI_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let index = Arc::new(RecordingIndex::default());
	let service = build_service(&test_db, index.clone()).await;
	let asthma = create_condition(&service, "Asthma").await;
	let croup = create_condition(&service, "Croup").await;
	let sinusitis = create_condition(&service, "Sinusitis").await;

	// Removed behind the index's back, as when the point delete failed.
	conditions::delete_condition(&service.db.pool, croup)
		.await
		.expect("Failed to delete condition.")
		.expect("Condition must exist.");

	// Above the sequence high-water mark, so it stands for a condition created mid-rebuild.
	let newer = sinusitis + 1_000;

	index.stored.lock().unwrap().insert(newer);

	assert!(index.stored.lock().unwrap().contains(&croup));

	let report = service.rebuild_index().await.expect("Rebuild failed.");

	assert_eq!(report.indexed_count, 2);
	assert_eq!(
		*index.stored.lock().unwrap(),
		BTreeSet::from([asthma, sinusitis, newer])
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MEDI_PG_DSN to run."]
async fn condition_detail_lists_primary_plan_first() {
	let Some(base_dsn) = medi_testkit::env_dsn() else {
		eprintln!("Skipping condition_detail_lists_primary_plan_first; set MEDI_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let index = Arc::new(RecordingIndex::default());
	let service = build_service(&test_db, index.clone()).await;
	let condition_id = create_condition(&service, "Migraine").await;
	let mut plan_ids = Vec::new();

	for name in ["Supportive care", "Triptan course"] {
		let plan = service
			.create_treatment_plan(CreateTreatmentPlanRequest {
				name: name.to_string(),
				description: None,
				medications: Vec::new(),
				procedures: Vec::new(),
				factors: Vec::new(),
				contraindications: Vec::new(),
			})
			.await
			.expect("Failed to create plan.");

		plan_ids.push(plan.id);
	}

	service
		.link_treatment_plan(
			condition_id,
			LinkTreatmentPlanRequest {
				treatment_plan_id: plan_ids[0],
				is_primary: false,
				priority: 50,
				notes: None,
			},
		)
		.await
		.expect("Failed to link plan.");
	service
		.link_treatment_plan(
			condition_id,
			LinkTreatmentPlanRequest {
				treatment_plan_id: plan_ids[1],
				is_primary: true,
				priority: 10,
				notes: Some("First line.".to_string()),
			},
		)
		.await
		.expect("Failed to link plan.");

	let detail = service.get_condition(condition_id).await.expect("Failed to load condition.");

	assert_eq!(
		detail.treatment_plans.iter().map(|plan| plan.plan.id).collect::<Vec<_>>(),
		vec![plan_ids[1], plan_ids[0]]
	);

	service.delete_condition(condition_id).await.expect("Failed to delete condition.");

	assert_eq!(*index.deleted.lock().unwrap(), vec![condition_id]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
