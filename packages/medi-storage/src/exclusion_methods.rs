use sqlx::PgExecutor;

use crate::{
	Error, Page, Result,
	models::{ConditionExclusionMethod, ExclusionMethod},
};

const METHOD_COLUMNS: &str = "id, name, description, procedure_steps, created_at, updated_at";

pub struct NewExclusionMethod<'a> {
	pub name: &'a str,
	pub description: Option<&'a str>,
	pub procedure_steps: &'a [String],
}

#[derive(Default)]
pub struct ExclusionMethodPatch<'a> {
	pub name: Option<&'a str>,
	pub description: Option<&'a str>,
	pub procedure_steps: Option<&'a [String]>,
}

pub async fn insert_exclusion_method<'e, E>(
	executor: E,
	new: &NewExclusionMethod<'_>,
) -> Result<ExclusionMethod>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO exclusion_methods (name, description, procedure_steps)
VALUES ($1, $2, $3)
RETURNING {METHOD_COLUMNS}"
	);
	let row = sqlx::query_as::<_, ExclusionMethod>(&sql)
		.bind(new.name)
		.bind(new.description)
		.bind(new.procedure_steps)
		.fetch_one(executor)
		.await
		.map_err(|err| Error::from_write(err, "Exclusion method"))?;

	Ok(row)
}

pub async fn get_exclusion_method<'e, E>(executor: E, method_id: i64) -> Result<Option<ExclusionMethod>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {METHOD_COLUMNS} FROM exclusion_methods WHERE id = $1");
	let row = sqlx::query_as::<_, ExclusionMethod>(&sql).bind(method_id).fetch_optional(executor).await?;

	Ok(row)
}

pub async fn list_exclusion_methods<'e, E>(executor: E, page: Page) -> Result<Vec<ExclusionMethod>>
where
	E: PgExecutor<'e>,
{
	let sql =
		format!("SELECT {METHOD_COLUMNS} FROM exclusion_methods ORDER BY id LIMIT $1 OFFSET $2");
	let rows = sqlx::query_as::<_, ExclusionMethod>(&sql)
		.bind(page.limit)
		.bind(page.skip)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn count_exclusion_methods<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let total: i64 =
		sqlx::query_scalar("SELECT count(*) FROM exclusion_methods").fetch_one(executor).await?;

	Ok(total)
}

pub async fn update_exclusion_method<'e, E>(
	executor: E,
	method_id: i64,
	patch: &ExclusionMethodPatch<'_>,
) -> Result<Option<ExclusionMethod>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE exclusion_methods
SET
	name = COALESCE($2, name),
	description = COALESCE($3, description),
	procedure_steps = COALESCE($4, procedure_steps),
	updated_at = now()
WHERE id = $1
RETURNING {METHOD_COLUMNS}"
	);
	let row = sqlx::query_as::<_, ExclusionMethod>(&sql)
		.bind(method_id)
		.bind(patch.name)
		.bind(patch.description)
		.bind(patch.procedure_steps)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Junction rows go with the method through the foreign-key cascade.
pub async fn delete_exclusion_method<'e, E>(executor: E, method_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM exclusion_methods WHERE id = $1")
		.bind(method_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn link_exclusion_method<'e, E>(
	executor: E,
	condition_id: i64,
	method_id: i64,
) -> Result<ConditionExclusionMethod>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, ConditionExclusionMethod>(
		"\
INSERT INTO condition_exclusion_methods (condition_id, exclusion_method_id)
VALUES ($1, $2)
RETURNING id, condition_id, exclusion_method_id, created_at",
	)
	.bind(condition_id)
	.bind(method_id)
	.fetch_one(executor)
	.await
	.map_err(|err| Error::from_write(err, "Condition exclusion method association"))?;

	Ok(row)
}

pub async fn unlink_exclusion_method<'e, E>(executor: E, association_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM condition_exclusion_methods WHERE id = $1")
		.bind(association_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

/// Methods linked to a condition, in association insertion order.
pub async fn exclusion_methods_for_condition<'e, E>(
	executor: E,
	condition_id: i64,
) -> Result<Vec<ExclusionMethod>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ExclusionMethod>(
		"\
SELECT em.id, em.name, em.description, em.procedure_steps, em.created_at, em.updated_at
FROM condition_exclusion_methods cem
JOIN exclusion_methods em ON em.id = cem.exclusion_method_id
WHERE cem.condition_id = $1
ORDER BY cem.id",
	)
	.bind(condition_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
