use sqlx::{PgExecutor, PgPool};

use crate::{Error, Page, Result, models::Condition};

const CONDITION_COLUMNS: &str = "id, name, full_description, summary, created_at, updated_at";

pub struct NewCondition<'a> {
	pub name: &'a str,
	pub full_description: Option<&'a str>,
	pub summary: &'a str,
}

/// Fields left as `None` keep their stored value.
#[derive(Default)]
pub struct ConditionPatch<'a> {
	pub name: Option<&'a str>,
	pub full_description: Option<&'a str>,
	pub summary: Option<&'a str>,
}

pub async fn insert_condition<'e, E>(executor: E, new: &NewCondition<'_>) -> Result<Condition>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO conditions (name, full_description, summary)
VALUES ($1, $2, $3)
RETURNING {CONDITION_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Condition>(&sql)
		.bind(new.name)
		.bind(new.full_description)
		.bind(new.summary)
		.fetch_one(executor)
		.await
		.map_err(|err| Error::from_write(err, "Condition"))?;

	Ok(row)
}

pub async fn get_condition<'e, E>(executor: E, condition_id: i64) -> Result<Option<Condition>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {CONDITION_COLUMNS} FROM conditions WHERE id = $1");
	let row = sqlx::query_as::<_, Condition>(&sql).bind(condition_id).fetch_optional(executor).await?;

	Ok(row)
}

pub async fn list_conditions<'e, E>(executor: E, page: Page) -> Result<Vec<Condition>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {CONDITION_COLUMNS} FROM conditions ORDER BY id LIMIT $1 OFFSET $2");
	let rows = sqlx::query_as::<_, Condition>(&sql)
		.bind(page.limit)
		.bind(page.skip)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn count_conditions<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let total: i64 = sqlx::query_scalar("SELECT count(*) FROM conditions").fetch_one(executor).await?;

	Ok(total)
}

/// Highest id the conditions sequence has handed out, or 0 before the first insert. Rows created
/// after this call get larger ids.
pub async fn condition_id_high_water<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let high_water: i64 = sqlx::query_scalar(
		"\
SELECT COALESCE(
	pg_sequence_last_value(pg_get_serial_sequence('conditions', 'id')::regclass),
	0
)",
	)
	.fetch_one(executor)
	.await?;

	Ok(high_water)
}

/// Keyset scan used by index rebuilds.
pub async fn list_conditions_after<'e, E>(
	executor: E,
	after_id: i64,
	limit: i64,
) -> Result<Vec<Condition>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT {CONDITION_COLUMNS} FROM conditions WHERE id > $1 ORDER BY id LIMIT $2"
	);
	let rows = sqlx::query_as::<_, Condition>(&sql)
		.bind(after_id)
		.bind(limit)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn update_condition<'e, E>(
	executor: E,
	condition_id: i64,
	patch: &ConditionPatch<'_>,
) -> Result<Option<Condition>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE conditions
SET
	name = COALESCE($2, name),
	full_description = COALESCE($3, full_description),
	summary = COALESCE($4, summary),
	updated_at = now()
WHERE id = $1
RETURNING {CONDITION_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Condition>(&sql)
		.bind(condition_id)
		.bind(patch.name)
		.bind(patch.full_description)
		.bind(patch.summary)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Deletes a condition, its junction rows, and its id from every conversation progress list in
/// one transaction. Returns the ids of the conversations whose progress changed, or `None` when the
/// condition does not exist.
pub async fn delete_condition(pool: &PgPool, condition_id: i64) -> Result<Option<Vec<i64>>> {
	let mut tx = pool.begin().await?;
	// The row lock taken here makes concurrent progress writes naming this id wait, so the strip
	// below sees whatever they committed.
	let deleted = sqlx::query("DELETE FROM conditions WHERE id = $1")
		.bind(condition_id)
		.execute(&mut *tx)
		.await?
		.rows_affected();

	if deleted == 0 {
		tx.rollback().await?;

		return Ok(None);
	}

	let touched: Vec<i64> = sqlx::query_scalar(
		"\
UPDATE conversations
SET
	progress = COALESCE(
		(
			SELECT jsonb_agg(elem ORDER BY ord)
			FROM jsonb_array_elements(progress) WITH ORDINALITY AS t(elem, ord)
			WHERE elem <> to_jsonb($1::bigint)
		),
		'[]'::jsonb
	),
	progress_version = progress_version + 1,
	updated_at = now()
WHERE progress @> jsonb_build_array($1::bigint)
RETURNING id",
	)
	.bind(condition_id)
	.fetch_all(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(Some(touched))
}

/// Returns the ids from `ids` that have no condition row, in input order.
pub async fn missing_condition_ids<'e, E>(executor: E, ids: &[i64]) -> Result<Vec<i64>>
where
	E: PgExecutor<'e>,
{
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let missing: Vec<i64> = sqlx::query_scalar(
		"\
SELECT t.id
FROM unnest($1::bigint[]) WITH ORDINALITY AS t(id, ord)
WHERE NOT EXISTS (SELECT 1 FROM conditions c WHERE c.id = t.id)
ORDER BY t.ord",
	)
	.bind(ids)
	.fetch_all(executor)
	.await?;

	Ok(missing)
}
