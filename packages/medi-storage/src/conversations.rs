use sqlx::{PgExecutor, types::Json};

use crate::{
	Page, Result,
	models::{Conversation, ProgressRow},
};

const CONVERSATION_COLUMNS: &str = "\
id, title, department, patient_id, user_id, progress, progress_version, started_at, created_at, \
updated_at";

pub struct NewConversation<'a> {
	pub title: &'a str,
	pub department: Option<&'a str>,
	pub patient_id: Option<i64>,
	pub user_id: Option<i64>,
}

#[derive(Default)]
pub struct ConversationPatch<'a> {
	pub title: Option<&'a str>,
	pub department: Option<&'a str>,
	pub patient_id: Option<i64>,
	pub user_id: Option<i64>,
}

/// New conversations start with empty progress at version 0.
pub async fn insert_conversation<'e, E>(
	executor: E,
	new: &NewConversation<'_>,
) -> Result<Conversation>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO conversations (title, department, patient_id, user_id)
VALUES ($1, $2, $3, $4)
RETURNING {CONVERSATION_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Conversation>(&sql)
		.bind(new.title)
		.bind(new.department)
		.bind(new.patient_id)
		.bind(new.user_id)
		.fetch_one(executor)
		.await?;

	Ok(row)
}

pub async fn get_conversation<'e, E>(
	executor: E,
	conversation_id: i64,
) -> Result<Option<Conversation>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1");
	let row = sqlx::query_as::<_, Conversation>(&sql)
		.bind(conversation_id)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

pub async fn conversation_exists<'e, E>(executor: E, conversation_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM conversations WHERE id = $1)")
		.bind(conversation_id)
		.fetch_one(executor)
		.await?;

	Ok(exists)
}

/// Most recent first.
pub async fn list_conversations<'e, E>(executor: E, page: Page) -> Result<Vec<Conversation>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT {CONVERSATION_COLUMNS}
FROM conversations
ORDER BY started_at DESC, id DESC
LIMIT $1 OFFSET $2"
	);
	let rows = sqlx::query_as::<_, Conversation>(&sql)
		.bind(page.limit)
		.bind(page.skip)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn count_conversations<'e, E>(executor: E) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let total: i64 =
		sqlx::query_scalar("SELECT count(*) FROM conversations").fetch_one(executor).await?;

	Ok(total)
}

pub async fn update_conversation<'e, E>(
	executor: E,
	conversation_id: i64,
	patch: &ConversationPatch<'_>,
) -> Result<Option<Conversation>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE conversations
SET
	title = COALESCE($2, title),
	department = COALESCE($3, department),
	patient_id = COALESCE($4, patient_id),
	user_id = COALESCE($5, user_id),
	updated_at = now()
WHERE id = $1
RETURNING {CONVERSATION_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Conversation>(&sql)
		.bind(conversation_id)
		.bind(patch.title)
		.bind(patch.department)
		.bind(patch.patient_id)
		.bind(patch.user_id)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

/// Messages go with the conversation through the foreign-key cascade.
pub async fn delete_conversation<'e, E>(executor: E, conversation_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
		.bind(conversation_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn get_progress<'e, E>(executor: E, conversation_id: i64) -> Result<Option<ProgressRow>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, ProgressRow>(
		"SELECT progress, progress_version FROM conversations WHERE id = $1",
	)
	.bind(conversation_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Writes `progress` when every listed condition still exists and, with `expected_version`, the
/// stored version still matches. The listed condition rows are held `FOR SHARE` for the statement,
/// so a concurrent delete either waits for this write or makes it fail. Returns the new version, or
/// `None` when nothing was written.
pub async fn write_progress<'e, E>(
	executor: E,
	conversation_id: i64,
	progress: &[i64],
	expected_version: Option<i64>,
) -> Result<Option<i64>>
where
	E: PgExecutor<'e>,
{
	let version: Option<i64> = sqlx::query_scalar(
		"\
WITH listed AS (
	SELECT DISTINCT listed.condition_id
	FROM unnest($3::bigint[]) AS listed(condition_id)
),
held AS (
	SELECT conditions.id
	FROM conditions
	JOIN listed ON listed.condition_id = conditions.id
	FOR SHARE OF conditions
)
UPDATE conversations
SET
	progress = $2,
	progress_version = progress_version + 1,
	updated_at = now()
WHERE id = $1
	AND ($4::bigint IS NULL OR progress_version = $4)
	AND (SELECT count(*) FROM held) = (SELECT count(*) FROM listed)
RETURNING progress_version",
	)
	.bind(conversation_id)
	.bind(Json(progress))
	.bind(progress)
	.bind(expected_version)
	.fetch_optional(executor)
	.await?;

	Ok(version)
}
