use serde::Deserialize;

use medi_domain::treatment::{self, PlanRank};
use medi_storage::{
	models::{ConditionTreatmentPlan, LinkedTreatmentPlan, TreatmentPlan},
	treatment_plans::{self, NewPlanLink, NewTreatmentPlan, PlanLinkPatch, TreatmentPlanPatch},
};

use crate::{Error, ListResponse, MediService, PageRequest, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateTreatmentPlanRequest {
	pub name: String,
	pub description: Option<String>,
	#[serde(default)]
	pub medications: Vec<String>,
	#[serde(default)]
	pub procedures: Vec<String>,
	#[serde(default)]
	pub factors: Vec<String>,
	#[serde(default)]
	pub contraindications: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateTreatmentPlanRequest {
	pub name: Option<String>,
	pub description: Option<String>,
	pub medications: Option<Vec<String>>,
	pub procedures: Option<Vec<String>>,
	pub factors: Option<Vec<String>>,
	pub contraindications: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LinkTreatmentPlanRequest {
	pub treatment_plan_id: i64,
	#[serde(default)]
	pub is_primary: bool,
	#[serde(default)]
	pub priority: i32,
	pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdatePlanLinkRequest {
	pub is_primary: Option<bool>,
	pub priority: Option<i32>,
	pub notes: Option<String>,
}

impl MediService {
	pub async fn create_treatment_plan(
		&self,
		req: CreateTreatmentPlanRequest,
	) -> Result<TreatmentPlan> {
		crate::require_text("name", &req.name)?;

		Ok(treatment_plans::insert_treatment_plan(
			&self.db.pool,
			&NewTreatmentPlan {
				name: req.name.trim(),
				description: req.description.as_deref(),
				medications: &req.medications,
				procedures: &req.procedures,
				factors: &req.factors,
				contraindications: &req.contraindications,
			},
		)
		.await?)
	}

	pub async fn get_treatment_plan(&self, plan_id: i64) -> Result<TreatmentPlan> {
		treatment_plans::get_treatment_plan(&self.db.pool, plan_id)
			.await?
			.ok_or_else(|| plan_not_found(plan_id))
	}

	pub async fn list_treatment_plans(
		&self,
		req: PageRequest,
	) -> Result<ListResponse<TreatmentPlan>> {
		let page = self.page(&req)?;
		let (total, items) = tokio::try_join!(
			treatment_plans::count_treatment_plans(&self.db.pool),
			treatment_plans::list_treatment_plans(&self.db.pool, page),
		)?;

		Ok(ListResponse { total, items })
	}

	pub async fn update_treatment_plan(
		&self,
		plan_id: i64,
		req: UpdateTreatmentPlanRequest,
	) -> Result<TreatmentPlan> {
		if let Some(name) = req.name.as_deref() {
			crate::require_text("name", name)?;
		}

		treatment_plans::update_treatment_plan(
			&self.db.pool,
			plan_id,
			&TreatmentPlanPatch {
				name: req.name.as_deref().map(str::trim),
				description: req.description.as_deref(),
				medications: req.medications.as_deref(),
				procedures: req.procedures.as_deref(),
				factors: req.factors.as_deref(),
				contraindications: req.contraindications.as_deref(),
			},
		)
		.await?
		.ok_or_else(|| plan_not_found(plan_id))
	}

	pub async fn delete_treatment_plan(&self, plan_id: i64) -> Result<()> {
		if !treatment_plans::delete_treatment_plan(&self.db.pool, plan_id).await? {
			return Err(plan_not_found(plan_id));
		}

		Ok(())
	}

	pub async fn link_treatment_plan(
		&self,
		condition_id: i64,
		req: LinkTreatmentPlanRequest,
	) -> Result<ConditionTreatmentPlan> {
		Ok(treatment_plans::link_treatment_plan(
			&self.db.pool,
			&NewPlanLink {
				condition_id,
				treatment_plan_id: req.treatment_plan_id,
				is_primary: req.is_primary,
				priority: req.priority,
				notes: req.notes.as_deref(),
			},
		)
		.await?)
	}

	pub async fn update_plan_link(
		&self,
		association_id: i64,
		req: UpdatePlanLinkRequest,
	) -> Result<ConditionTreatmentPlan> {
		treatment_plans::update_plan_link(
			&self.db.pool,
			association_id,
			&PlanLinkPatch {
				is_primary: req.is_primary,
				priority: req.priority,
				notes: req.notes.as_deref(),
			},
		)
		.await?
		.ok_or_else(|| link_not_found(association_id))
	}

	pub async fn unlink_treatment_plan(&self, association_id: i64) -> Result<()> {
		if !treatment_plans::unlink_treatment_plan(&self.db.pool, association_id).await? {
			return Err(link_not_found(association_id));
		}

		Ok(())
	}

	/// Plans for one condition in recommendation order.
	pub async fn condition_treatment_plans(
		&self,
		condition_id: i64,
	) -> Result<ListResponse<LinkedTreatmentPlan>> {
		self.require_condition(condition_id).await?;

		let plans =
			treatment_plans::treatment_plans_for_condition(&self.db.pool, condition_id).await?;
		let items = treatment::order_treatment_plans(plans, usize::MAX, |plan| PlanRank {
			association_id: plan.association_id,
			is_primary: plan.is_primary,
			priority: plan.priority,
		});

		Ok(ListResponse { total: items.len() as i64, items })
	}
}

fn plan_not_found(plan_id: i64) -> Error {
	Error::not_found(format!("Treatment plan {plan_id} does not exist."))
}

fn link_not_found(association_id: i64) -> Error {
	Error::not_found(format!("Treatment plan association {association_id} does not exist."))
}
