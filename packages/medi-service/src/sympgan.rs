//! The SympGAN disease and symptom knowledge base, linked through disease-symptom associations.

use serde::Deserialize;

use medi_storage::{
	models::{Disease, DiseaseSymptomAssociation, Symptom},
	sympgan::{self, DiseasePatch, NewDisease, NewSymptom, SymptomPatch},
};

use crate::{Error, ListResponse, MediService, PageRequest, Result};

pub const DEFAULT_SEARCH_LIMIT: i64 = 10;

#[derive(Clone, Debug, Deserialize)]
pub struct CreateDiseaseRequest {
	pub cui: String,
	pub name: String,
	pub alias: Option<String>,
	pub definition: Option<String>,
	pub external_ids: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateDiseaseRequest {
	pub name: Option<String>,
	pub alias: Option<String>,
	pub definition: Option<String>,
	pub external_ids: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateSymptomRequest {
	pub cui: String,
	pub name: String,
	pub alias: Option<String>,
	pub definition: Option<String>,
	pub external_ids: Option<String>,
	pub full_description: Option<String>,
	pub summary: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateSymptomRequest {
	pub name: Option<String>,
	pub alias: Option<String>,
	pub definition: Option<String>,
	pub external_ids: Option<String>,
	pub full_description: Option<String>,
	pub summary: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct KnowledgeSearchRequest {
	pub limit: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LinkDiseaseSymptomRequest {
	pub disease_id: i64,
	pub symptom_id: i64,
	pub source: Option<String>,
}

impl MediService {
	/// A CUI that already exists fails with `Conflict`.
	pub async fn create_disease(&self, req: CreateDiseaseRequest) -> Result<Disease> {
		crate::require_text("cui", &req.cui)?;
		crate::require_text("name", &req.name)?;

		Ok(sympgan::insert_disease(
			&self.db.pool,
			&NewDisease {
				cui: req.cui.trim(),
				name: req.name.trim(),
				alias: req.alias.as_deref(),
				definition: req.definition.as_deref(),
				external_ids: req.external_ids.as_deref(),
			},
		)
		.await?)
	}

	pub async fn get_disease(&self, disease_id: i64) -> Result<Disease> {
		sympgan::get_disease(&self.db.pool, disease_id)
			.await?
			.ok_or_else(|| disease_not_found(disease_id))
	}

	pub async fn list_diseases(&self, req: PageRequest) -> Result<ListResponse<Disease>> {
		let page = self.page(&req)?;
		let (total, items) = tokio::try_join!(
			sympgan::count_diseases(&self.db.pool),
			sympgan::list_diseases(&self.db.pool, page),
		)?;

		Ok(ListResponse { total, items })
	}

	/// Case-insensitive substring match on name and alias.
	pub async fn search_diseases(
		&self,
		query: &str,
		req: KnowledgeSearchRequest,
	) -> Result<ListResponse<Disease>> {
		let limit = self.search_limit(query, &req)?;
		let items = sympgan::search_diseases(&self.db.pool, query.trim(), limit).await?;

		Ok(ListResponse { total: items.len() as i64, items })
	}

	pub async fn update_disease(
		&self,
		disease_id: i64,
		req: UpdateDiseaseRequest,
	) -> Result<Disease> {
		if let Some(name) = req.name.as_deref() {
			crate::require_text("name", name)?;
		}

		sympgan::update_disease(
			&self.db.pool,
			disease_id,
			&DiseasePatch {
				name: req.name.as_deref().map(str::trim),
				alias: req.alias.as_deref(),
				definition: req.definition.as_deref(),
				external_ids: req.external_ids.as_deref(),
			},
		)
		.await?
		.ok_or_else(|| disease_not_found(disease_id))
	}

	pub async fn delete_disease(&self, disease_id: i64) -> Result<()> {
		if !sympgan::delete_disease(&self.db.pool, disease_id).await? {
			return Err(disease_not_found(disease_id));
		}

		Ok(())
	}

	pub async fn create_symptom(&self, req: CreateSymptomRequest) -> Result<Symptom> {
		crate::require_text("cui", &req.cui)?;
		crate::require_text("name", &req.name)?;

		Ok(sympgan::insert_symptom(
			&self.db.pool,
			&NewSymptom {
				cui: req.cui.trim(),
				name: req.name.trim(),
				alias: req.alias.as_deref(),
				definition: req.definition.as_deref(),
				external_ids: req.external_ids.as_deref(),
				full_description: req.full_description.as_deref(),
				summary: req.summary.as_deref(),
			},
		)
		.await?)
	}

	pub async fn get_symptom(&self, symptom_id: i64) -> Result<Symptom> {
		sympgan::get_symptom(&self.db.pool, symptom_id)
			.await?
			.ok_or_else(|| symptom_not_found(symptom_id))
	}

	pub async fn list_symptoms(&self, req: PageRequest) -> Result<ListResponse<Symptom>> {
		let page = self.page(&req)?;
		let (total, items) = tokio::try_join!(
			sympgan::count_symptoms(&self.db.pool),
			sympgan::list_symptoms(&self.db.pool, page),
		)?;

		Ok(ListResponse { total, items })
	}

	pub async fn search_symptoms(
		&self,
		query: &str,
		req: KnowledgeSearchRequest,
	) -> Result<ListResponse<Symptom>> {
		let limit = self.search_limit(query, &req)?;
		let items = sympgan::search_symptoms(&self.db.pool, query.trim(), limit).await?;

		Ok(ListResponse { total: items.len() as i64, items })
	}

	pub async fn update_symptom(
		&self,
		symptom_id: i64,
		req: UpdateSymptomRequest,
	) -> Result<Symptom> {
		if let Some(name) = req.name.as_deref() {
			crate::require_text("name", name)?;
		}

		sympgan::update_symptom(
			&self.db.pool,
			symptom_id,
			&SymptomPatch {
				name: req.name.as_deref().map(str::trim),
				alias: req.alias.as_deref(),
				definition: req.definition.as_deref(),
				external_ids: req.external_ids.as_deref(),
				full_description: req.full_description.as_deref(),
				summary: req.summary.as_deref(),
			},
		)
		.await?
		.ok_or_else(|| symptom_not_found(symptom_id))
	}

	pub async fn delete_symptom(&self, symptom_id: i64) -> Result<()> {
		if !sympgan::delete_symptom(&self.db.pool, symptom_id).await? {
			return Err(symptom_not_found(symptom_id));
		}

		Ok(())
	}

	/// Idempotent. Linking an existing pair returns the stored association.
	pub async fn link_disease_symptom(
		&self,
		req: LinkDiseaseSymptomRequest,
	) -> Result<DiseaseSymptomAssociation> {
		Ok(sympgan::link_disease_symptom(
			&self.db.pool,
			req.disease_id,
			req.symptom_id,
			req.source.as_deref(),
		)
		.await?)
	}

	pub async fn disease_symptoms(&self, disease_id: i64) -> Result<ListResponse<Symptom>> {
		self.get_disease(disease_id).await?;

		let items = sympgan::symptoms_for_disease(&self.db.pool, disease_id).await?;

		Ok(ListResponse { total: items.len() as i64, items })
	}

	pub async fn symptom_diseases(&self, symptom_id: i64) -> Result<ListResponse<Disease>> {
		self.get_symptom(symptom_id).await?;

		let items = sympgan::diseases_for_symptom(&self.db.pool, symptom_id).await?;

		Ok(ListResponse { total: items.len() as i64, items })
	}

	fn search_limit(&self, query: &str, req: &KnowledgeSearchRequest) -> Result<i64> {
		crate::require_text("query", query)?;

		let limit = req.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

		if limit < 1 {
			return Err(Error::invalid_request("limit must be at least 1."));
		}

		Ok(limit.min(i64::from(self.cfg.knowledge.page_limit_max)))
	}
}

fn disease_not_found(disease_id: i64) -> Error {
	Error::not_found(format!("Disease {disease_id} does not exist."))
}

fn symptom_not_found(symptom_id: i64) -> Error {
	Error::not_found(format!("Symptom {symptom_id} does not exist."))
}
