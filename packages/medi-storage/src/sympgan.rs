//! SympGAN disease and symptom knowledge base.

use sqlx::PgExecutor;

use crate::{
	Error, Page, Result,
	models::{Disease, DiseaseSymptomAssociation, Symptom},
};

const DISEASE_COLUMNS: &str = "id, cui, name, alias, definition, external_ids, created_at";
const SYMPTOM_COLUMNS: &str = "\
id, cui, name, alias, definition, external_ids, full_description, summary, created_at";
const ASSOCIATION_COLUMNS: &str = "id, disease_id, symptom_id, source, created_at";

pub struct NewDisease<'a> {
	pub cui: &'a str,
	pub name: &'a str,
	pub alias: Option<&'a str>,
	pub definition: Option<&'a str>,
	pub external_ids: Option<&'a str>,
}

#[derive(Default)]
pub struct DiseasePatch<'a> {
	pub name: Option<&'a str>,
	pub alias: Option<&'a str>,
	pub definition: Option<&'a str>,
	pub external_ids: Option<&'a str>,
}

pub struct NewSymptom<'a> {
	pub cui: &'a str,
	pub name: &'a str,
	pub alias: Option<&'a str>,
	pub definition: Option<&'a str>,
	pub external_ids: Option<&'a str>,
	pub full_description: Option<&'a str>,
	pub summary: Option<&'a str>,
}

#[derive(Default)]
pub struct SymptomPatch<'a> {
	pub name: Option<&'a str>,
	pub alias: Option<&'a str>,
	pub definition: Option<&'a str>,
	pub external_ids: Option<&'a str>,
	pub full_description: Option<&'a str>,
	pub summary: Option<&'a str>,
}

pub async fn insert_disease<'e, E>(executor: E, new: &NewDisease<'_>) -> Result<Disease>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO diseases (cui, name, alias, definition, external_ids)
VALUES ($1, $2, $3, $4, $5)
RETURNING {DISEASE_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Disease>(&sql)
		.bind(new.cui)
		.bind(new.name)
		.bind(new.alias)
		.bind(new.definition)
		.bind(new.external_ids)
		.fetch_one(executor)
		.await
		.map_err(|err| Error::from_write(err, "Disease CUI"))?;

	Ok(row)
}

/// Inserts or refreshes a disease keyed by CUI. Returns the row id.
pub async fn upsert_disease<'e, E>(executor: E, new: &NewDisease<'_>) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let id: i64 = sqlx::query_scalar(
		"\
INSERT INTO diseases (cui, name, alias, definition, external_ids)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (cui) DO UPDATE
SET
	name = EXCLUDED.name,
	alias = EXCLUDED.alias,
	definition = EXCLUDED.definition,
	external_ids = EXCLUDED.external_ids
RETURNING id",
	)
	.bind(new.cui)
	.bind(new.name)
	.bind(new.alias)
	.bind(new.definition)
	.bind(new.external_ids)
	.fetch_one(executor)
	.await?;

	Ok(id)
}

pub async fn get_disease<'e, E>(executor: E, disease_id: i64) -> Result<Option<Disease>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {DISEASE_COLUMNS} FROM diseases WHERE id = $1");
	let row = sqlx::query_as::<_, Disease>(&sql).bind(disease_id).fetch_optional(executor).await?;

	Ok(row)
}

pub async fn list_diseases<'e, E>(executor: E, page: Page) -> Result<Vec<Disease>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {DISEASE_COLUMNS} FROM diseases ORDER BY id LIMIT $1 OFFSET $2");
	let rows =
		sqlx::query_as::<_, Disease>(&sql).bind(page.limit).bind(page.skip).fetch_all(executor).await?;

	Ok(rows)
}

pub async fn count_diseases<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let total: i64 = sqlx::query_scalar("SELECT count(*) FROM diseases").fetch_one(executor).await?;

	Ok(total)
}

/// Case-insensitive substring match on the name.
pub async fn search_diseases<'e, E>(executor: E, query: &str, limit: i64) -> Result<Vec<Disease>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT {DISEASE_COLUMNS} FROM diseases WHERE name ILIKE $1 ORDER BY name, id LIMIT $2"
	);
	let rows = sqlx::query_as::<_, Disease>(&sql)
		.bind(like_pattern(query))
		.bind(limit)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn update_disease<'e, E>(
	executor: E,
	disease_id: i64,
	patch: &DiseasePatch<'_>,
) -> Result<Option<Disease>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE diseases
SET
	name = COALESCE($2, name),
	alias = COALESCE($3, alias),
	definition = COALESCE($4, definition),
	external_ids = COALESCE($5, external_ids)
WHERE id = $1
RETURNING {DISEASE_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Disease>(&sql)
		.bind(disease_id)
		.bind(patch.name)
		.bind(patch.alias)
		.bind(patch.definition)
		.bind(patch.external_ids)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

pub async fn delete_disease<'e, E>(executor: E, disease_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result =
		sqlx::query("DELETE FROM diseases WHERE id = $1").bind(disease_id).execute(executor).await?;

	Ok(result.rows_affected() > 0)
}

pub async fn insert_symptom<'e, E>(executor: E, new: &NewSymptom<'_>) -> Result<Symptom>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO symptoms (cui, name, alias, definition, external_ids, full_description, summary)
VALUES ($1, $2, $3, $4, $5, $6, $7)
RETURNING {SYMPTOM_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Symptom>(&sql)
		.bind(new.cui)
		.bind(new.name)
		.bind(new.alias)
		.bind(new.definition)
		.bind(new.external_ids)
		.bind(new.full_description)
		.bind(new.summary)
		.fetch_one(executor)
		.await
		.map_err(|err| Error::from_write(err, "Symptom CUI"))?;

	Ok(row)
}

/// Inserts or refreshes a symptom keyed by CUI. Curated description and summary are kept.
pub async fn upsert_symptom<'e, E>(executor: E, new: &NewSymptom<'_>) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let id: i64 = sqlx::query_scalar(
		"\
INSERT INTO symptoms (cui, name, alias, definition, external_ids, full_description, summary)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (cui) DO UPDATE
SET
	name = EXCLUDED.name,
	alias = EXCLUDED.alias,
	definition = EXCLUDED.definition,
	external_ids = EXCLUDED.external_ids,
	full_description = COALESCE(symptoms.full_description, EXCLUDED.full_description),
	summary = COALESCE(symptoms.summary, EXCLUDED.summary)
RETURNING id",
	)
	.bind(new.cui)
	.bind(new.name)
	.bind(new.alias)
	.bind(new.definition)
	.bind(new.external_ids)
	.bind(new.full_description)
	.bind(new.summary)
	.fetch_one(executor)
	.await?;

	Ok(id)
}

pub async fn get_symptom<'e, E>(executor: E, symptom_id: i64) -> Result<Option<Symptom>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {SYMPTOM_COLUMNS} FROM symptoms WHERE id = $1");
	let row = sqlx::query_as::<_, Symptom>(&sql).bind(symptom_id).fetch_optional(executor).await?;

	Ok(row)
}

pub async fn list_symptoms<'e, E>(executor: E, page: Page) -> Result<Vec<Symptom>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {SYMPTOM_COLUMNS} FROM symptoms ORDER BY id LIMIT $1 OFFSET $2");
	let rows =
		sqlx::query_as::<_, Symptom>(&sql).bind(page.limit).bind(page.skip).fetch_all(executor).await?;

	Ok(rows)
}

pub async fn count_symptoms<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let total: i64 = sqlx::query_scalar("SELECT count(*) FROM symptoms").fetch_one(executor).await?;

	Ok(total)
}

pub async fn search_symptoms<'e, E>(executor: E, query: &str, limit: i64) -> Result<Vec<Symptom>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT {SYMPTOM_COLUMNS} FROM symptoms WHERE name ILIKE $1 ORDER BY name, id LIMIT $2"
	);
	let rows = sqlx::query_as::<_, Symptom>(&sql)
		.bind(like_pattern(query))
		.bind(limit)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn update_symptom<'e, E>(
	executor: E,
	symptom_id: i64,
	patch: &SymptomPatch<'_>,
) -> Result<Option<Symptom>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE symptoms
SET
	name = COALESCE($2, name),
	alias = COALESCE($3, alias),
	definition = COALESCE($4, definition),
	external_ids = COALESCE($5, external_ids),
	full_description = COALESCE($6, full_description),
	summary = COALESCE($7, summary)
WHERE id = $1
RETURNING {SYMPTOM_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Symptom>(&sql)
		.bind(symptom_id)
		.bind(patch.name)
		.bind(patch.alias)
		.bind(patch.definition)
		.bind(patch.external_ids)
		.bind(patch.full_description)
		.bind(patch.summary)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

pub async fn delete_symptom<'e, E>(executor: E, symptom_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result =
		sqlx::query("DELETE FROM symptoms WHERE id = $1").bind(symptom_id).execute(executor).await?;

	Ok(result.rows_affected() > 0)
}

/// Idempotent: an existing pair is returned unchanged.
pub async fn link_disease_symptom<'e, E>(
	executor: E,
	disease_id: i64,
	symptom_id: i64,
	source: Option<&str>,
) -> Result<DiseaseSymptomAssociation>
where
	E: PgExecutor<'e>,
{
	// The no-op DO UPDATE makes RETURNING yield the existing row on conflict.
	let sql = format!(
		"\
INSERT INTO disease_symptom_associations (disease_id, symptom_id, source)
VALUES ($1, $2, $3)
ON CONFLICT (disease_id, symptom_id) DO UPDATE
SET source = disease_symptom_associations.source
RETURNING {ASSOCIATION_COLUMNS}"
	);
	let row = sqlx::query_as::<_, DiseaseSymptomAssociation>(&sql)
		.bind(disease_id)
		.bind(symptom_id)
		.bind(source)
		.fetch_one(executor)
		.await
		.map_err(|err| Error::from_write(err, "Disease symptom association"))?;

	Ok(row)
}

/// Bulk link by CUI pairs. Pairs whose CUIs are unknown are ignored. Returns the inserted count.
pub async fn link_by_cui<'e, E>(
	executor: E,
	disease_cuis: &[String],
	symptom_cuis: &[String],
	source: Option<&str>,
) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	if disease_cuis.len() != symptom_cuis.len() {
		return Err(Error::InvalidArgument(
			"Disease and symptom CUI lists must have the same length.".to_string(),
		));
	}

	let result = sqlx::query(
		"\
INSERT INTO disease_symptom_associations (disease_id, symptom_id, source)
SELECT d.id, s.id, $3
FROM unnest($1::text[], $2::text[]) AS pair(disease_cui, symptom_cui)
JOIN diseases d ON d.cui = pair.disease_cui
JOIN symptoms s ON s.cui = pair.symptom_cui
ON CONFLICT (disease_id, symptom_id) DO NOTHING",
	)
	.bind(disease_cuis)
	.bind(symptom_cuis)
	.bind(source)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}

pub async fn symptoms_for_disease<'e, E>(executor: E, disease_id: i64) -> Result<Vec<Symptom>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, Symptom>(
		"\
SELECT s.id, s.cui, s.name, s.alias, s.definition, s.external_ids, s.full_description, s.summary,
	s.created_at
FROM disease_symptom_associations a
JOIN symptoms s ON s.id = a.symptom_id
WHERE a.disease_id = $1
ORDER BY a.id",
	)
	.bind(disease_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn diseases_for_symptom<'e, E>(executor: E, symptom_id: i64) -> Result<Vec<Disease>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, Disease>(
		"\
SELECT d.id, d.cui, d.name, d.alias, d.definition, d.external_ids, d.created_at
FROM disease_symptom_associations a
JOIN diseases d ON d.id = a.disease_id
WHERE a.symptom_id = $1
ORDER BY a.id",
	)
	.bind(symptom_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

fn like_pattern(query: &str) -> String {
	let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");

	format!("%{escaped}%")
}
