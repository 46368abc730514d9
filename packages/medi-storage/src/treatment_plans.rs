use sqlx::PgExecutor;

use crate::{
	Error, Page, Result,
	models::{ConditionTreatmentPlan, LinkedTreatmentPlan, TreatmentPlan},
};

const PLAN_COLUMNS: &str = "\
id, name, description, medications, procedures, factors, contraindications, created_at, updated_at";
const LINK_COLUMNS: &str =
	"id, condition_id, treatment_plan_id, is_primary, priority, notes, created_at";

pub struct NewTreatmentPlan<'a> {
	pub name: &'a str,
	pub description: Option<&'a str>,
	pub medications: &'a [String],
	pub procedures: &'a [String],
	pub factors: &'a [String],
	pub contraindications: &'a [String],
}

#[derive(Default)]
pub struct TreatmentPlanPatch<'a> {
	pub name: Option<&'a str>,
	pub description: Option<&'a str>,
	pub medications: Option<&'a [String]>,
	pub procedures: Option<&'a [String]>,
	pub factors: Option<&'a [String]>,
	pub contraindications: Option<&'a [String]>,
}

pub struct NewPlanLink<'a> {
	pub condition_id: i64,
	pub treatment_plan_id: i64,
	pub is_primary: bool,
	pub priority: i32,
	pub notes: Option<&'a str>,
}

#[derive(Default)]
pub struct PlanLinkPatch<'a> {
	pub is_primary: Option<bool>,
	pub priority: Option<i32>,
	pub notes: Option<&'a str>,
}

pub async fn insert_treatment_plan<'e, E>(
	executor: E,
	new: &NewTreatmentPlan<'_>,
) -> Result<TreatmentPlan>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO treatment_plans (name, description, medications, procedures, factors, contraindications)
VALUES ($1, $2, $3, $4, $5, $6)
RETURNING {PLAN_COLUMNS}"
	);
	let row = sqlx::query_as::<_, TreatmentPlan>(&sql)
		.bind(new.name)
		.bind(new.description)
		.bind(new.medications)
		.bind(new.procedures)
		.bind(new.factors)
		.bind(new.contraindications)
		.fetch_one(executor)
		.await
		.map_err(|err| Error::from_write(err, "Treatment plan"))?;

	Ok(row)
}

pub async fn get_treatment_plan<'e, E>(executor: E, plan_id: i64) -> Result<Option<TreatmentPlan>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {PLAN_COLUMNS} FROM treatment_plans WHERE id = $1");
	let row = sqlx::query_as::<_, TreatmentPlan>(&sql).bind(plan_id).fetch_optional(executor).await?;

	Ok(row)
}

pub async fn list_treatment_plans<'e, E>(executor: E, page: Page) -> Result<Vec<TreatmentPlan>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {PLAN_COLUMNS} FROM treatment_plans ORDER BY id LIMIT $1 OFFSET $2");
	let rows = sqlx::query_as::<_, TreatmentPlan>(&sql)
		.bind(page.limit)
		.bind(page.skip)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn count_treatment_plans<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let total: i64 =
		sqlx::query_scalar("SELECT count(*) FROM treatment_plans").fetch_one(executor).await?;

	Ok(total)
}

pub async fn update_treatment_plan<'e, E>(
	executor: E,
	plan_id: i64,
	patch: &TreatmentPlanPatch<'_>,
) -> Result<Option<TreatmentPlan>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE treatment_plans
SET
	name = COALESCE($2, name),
	description = COALESCE($3, description),
	medications = COALESCE($4, medications),
	procedures = COALESCE($5, procedures),
	factors = COALESCE($6, factors),
	contraindications = COALESCE($7, contraindications),
	updated_at = now()
WHERE id = $1
RETURNING {PLAN_COLUMNS}"
	);
	let row = sqlx::query_as::<_, TreatmentPlan>(&sql)
		.bind(plan_id)
		.bind(patch.name)
		.bind(patch.description)
		.bind(patch.medications)
		.bind(patch.procedures)
		.bind(patch.factors)
		.bind(patch.contraindications)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

pub async fn delete_treatment_plan<'e, E>(executor: E, plan_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM treatment_plans WHERE id = $1")
		.bind(plan_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn link_treatment_plan<'e, E>(
	executor: E,
	link: &NewPlanLink<'_>,
) -> Result<ConditionTreatmentPlan>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO condition_treatment_plans (condition_id, treatment_plan_id, is_primary, priority, notes)
VALUES ($1, $2, $3, $4, $5)
RETURNING {LINK_COLUMNS}"
	);
	let row = sqlx::query_as::<_, ConditionTreatmentPlan>(&sql)
		.bind(link.condition_id)
		.bind(link.treatment_plan_id)
		.bind(link.is_primary)
		.bind(link.priority)
		.bind(link.notes)
		.fetch_one(executor)
		.await
		.map_err(|err| Error::from_write(err, "Condition treatment plan association"))?;

	Ok(row)
}

pub async fn update_plan_link<'e, E>(
	executor: E,
	association_id: i64,
	patch: &PlanLinkPatch<'_>,
) -> Result<Option<ConditionTreatmentPlan>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE condition_treatment_plans
SET
	is_primary = COALESCE($2, is_primary),
	priority = COALESCE($3, priority),
	notes = COALESCE($4, notes)
WHERE id = $1
RETURNING {LINK_COLUMNS}"
	);
	let row = sqlx::query_as::<_, ConditionTreatmentPlan>(&sql)
		.bind(association_id)
		.bind(patch.is_primary)
		.bind(patch.priority)
		.bind(patch.notes)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

pub async fn unlink_treatment_plan<'e, E>(executor: E, association_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM condition_treatment_plans WHERE id = $1")
		.bind(association_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

/// Plans linked to a condition, primary first, then priority descending, then association order.
pub async fn treatment_plans_for_condition<'e, E>(
	executor: E,
	condition_id: i64,
) -> Result<Vec<LinkedTreatmentPlan>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, LinkedTreatmentPlan>(
		"\
SELECT
	ctp.id AS association_id,
	ctp.is_primary,
	ctp.priority,
	ctp.notes,
	tp.id,
	tp.name,
	tp.description,
	tp.medications,
	tp.procedures,
	tp.factors,
	tp.contraindications,
	tp.created_at,
	tp.updated_at
FROM condition_treatment_plans ctp
JOIN treatment_plans tp ON tp.id = ctp.treatment_plan_id
WHERE ctp.condition_id = $1
ORDER BY ctp.is_primary DESC, ctp.priority DESC, ctp.id",
	)
	.bind(condition_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
