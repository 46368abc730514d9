use serde::Deserialize;

use medi_storage::{
	exclusion_methods::{self, ExclusionMethodPatch, NewExclusionMethod},
	models::{ConditionExclusionMethod, ExclusionMethod},
};

use crate::{Error, ListResponse, MediService, PageRequest, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateExclusionMethodRequest {
	pub name: String,
	pub description: Option<String>,
	#[serde(default)]
	pub procedure_steps: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateExclusionMethodRequest {
	pub name: Option<String>,
	pub description: Option<String>,
	pub procedure_steps: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LinkExclusionMethodRequest {
	pub exclusion_method_id: i64,
}

impl MediService {
	pub async fn create_exclusion_method(
		&self,
		req: CreateExclusionMethodRequest,
	) -> Result<ExclusionMethod> {
		crate::require_text("name", &req.name)?;

		Ok(exclusion_methods::insert_exclusion_method(
			&self.db.pool,
			&NewExclusionMethod {
				name: req.name.trim(),
				description: req.description.as_deref(),
				procedure_steps: &req.procedure_steps,
			},
		)
		.await?)
	}

	pub async fn get_exclusion_method(&self, method_id: i64) -> Result<ExclusionMethod> {
		exclusion_methods::get_exclusion_method(&self.db.pool, method_id)
			.await?
			.ok_or_else(|| method_not_found(method_id))
	}

	pub async fn list_exclusion_methods(
		&self,
		req: PageRequest,
	) -> Result<ListResponse<ExclusionMethod>> {
		let page = self.page(&req)?;
		let (total, items) = tokio::try_join!(
			exclusion_methods::count_exclusion_methods(&self.db.pool),
			exclusion_methods::list_exclusion_methods(&self.db.pool, page),
		)?;

		Ok(ListResponse { total, items })
	}

	pub async fn update_exclusion_method(
		&self,
		method_id: i64,
		req: UpdateExclusionMethodRequest,
	) -> Result<ExclusionMethod> {
		if let Some(name) = req.name.as_deref() {
			crate::require_text("name", name)?;
		}

		exclusion_methods::update_exclusion_method(
			&self.db.pool,
			method_id,
			&ExclusionMethodPatch {
				name: req.name.as_deref().map(str::trim),
				description: req.description.as_deref(),
				procedure_steps: req.procedure_steps.as_deref(),
			},
		)
		.await?
		.ok_or_else(|| method_not_found(method_id))
	}

	pub async fn delete_exclusion_method(&self, method_id: i64) -> Result<()> {
		if !exclusion_methods::delete_exclusion_method(&self.db.pool, method_id).await? {
			return Err(method_not_found(method_id));
		}

		Ok(())
	}

	/// Linking the same pair twice fails with `Conflict`.
	pub async fn link_exclusion_method(
		&self,
		condition_id: i64,
		req: LinkExclusionMethodRequest,
	) -> Result<ConditionExclusionMethod> {
		Ok(exclusion_methods::link_exclusion_method(
			&self.db.pool,
			condition_id,
			req.exclusion_method_id,
		)
		.await?)
	}

	pub async fn unlink_exclusion_method(&self, association_id: i64) -> Result<()> {
		if !exclusion_methods::unlink_exclusion_method(&self.db.pool, association_id).await? {
			return Err(Error::not_found(format!(
				"Exclusion method association {association_id} does not exist."
			)));
		}

		Ok(())
	}

	pub async fn condition_exclusion_methods(
		&self,
		condition_id: i64,
	) -> Result<ListResponse<ExclusionMethod>> {
		self.require_condition(condition_id).await?;

		let items =
			exclusion_methods::exclusion_methods_for_condition(&self.db.pool, condition_id).await?;

		Ok(ListResponse { total: items.len() as i64, items })
	}
}

fn method_not_found(method_id: i64) -> Error {
	Error::not_found(format!("Exclusion method {method_id} does not exist."))
}
