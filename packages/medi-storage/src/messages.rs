use sqlx::PgExecutor;

use crate::{Error, Page, Result, models::Message};

const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, sent_at, created_at";

pub struct NewMessage<'a> {
	pub conversation_id: i64,
	pub role: Option<&'a str>,
	pub content: &'a str,
}

#[derive(Default)]
pub struct MessagePatch<'a> {
	pub role: Option<&'a str>,
	pub content: Option<&'a str>,
}

pub async fn insert_message<'e, E>(executor: E, new: &NewMessage<'_>) -> Result<Message>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
INSERT INTO messages (conversation_id, role, content)
VALUES ($1, $2, $3)
RETURNING {MESSAGE_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Message>(&sql)
		.bind(new.conversation_id)
		.bind(new.role)
		.bind(new.content)
		.fetch_one(executor)
		.await
		.map_err(|err| Error::from_write(err, "Message"))?;

	Ok(row)
}

pub async fn get_message<'e, E>(executor: E, message_id: i64) -> Result<Option<Message>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
	let row = sqlx::query_as::<_, Message>(&sql).bind(message_id).fetch_optional(executor).await?;

	Ok(row)
}

/// Oldest first, ties by id.
pub async fn list_messages_for_conversation<'e, E>(
	executor: E,
	conversation_id: i64,
	page: Page,
) -> Result<Vec<Message>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT {MESSAGE_COLUMNS}
FROM messages
WHERE conversation_id = $1
ORDER BY sent_at, id
LIMIT $2 OFFSET $3"
	);
	let rows = sqlx::query_as::<_, Message>(&sql)
		.bind(conversation_id)
		.bind(page.limit)
		.bind(page.skip)
		.fetch_all(executor)
		.await?;

	Ok(rows)
}

pub async fn count_messages_for_conversation<'e, E>(executor: E, conversation_id: i64) -> Result<i64>
where
	E: PgExecutor<'e>,
{
	let total: i64 = sqlx::query_scalar("SELECT count(*) FROM messages WHERE conversation_id = $1")
		.bind(conversation_id)
		.fetch_one(executor)
		.await?;

	Ok(total)
}

pub async fn update_message<'e, E>(
	executor: E,
	message_id: i64,
	patch: &MessagePatch<'_>,
) -> Result<Option<Message>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
UPDATE messages
SET
	role = COALESCE($2, role),
	content = COALESCE($3, content)
WHERE id = $1
RETURNING {MESSAGE_COLUMNS}"
	);
	let row = sqlx::query_as::<_, Message>(&sql)
		.bind(message_id)
		.bind(patch.role)
		.bind(patch.content)
		.fetch_optional(executor)
		.await?;

	Ok(row)
}

pub async fn delete_message<'e, E>(executor: E, message_id: i64) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result =
		sqlx::query("DELETE FROM messages WHERE id = $1").bind(message_id).execute(executor).await?;

	Ok(result.rows_affected() > 0)
}
