use serde::Deserialize;

use medi_storage::{
	conversations,
	messages::{self, MessagePatch, NewMessage},
	models::Message,
};

use crate::{
	Error, ListResponse, MediService, PageRequest, Result,
	conversations::conversation_not_found,
};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateMessageRequest {
	pub role: Option<String>,
	pub content: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateMessageRequest {
	pub role: Option<String>,
	pub content: Option<String>,
}

impl MediService {
	pub async fn create_message(
		&self,
		conversation_id: i64,
		req: CreateMessageRequest,
	) -> Result<Message> {
		crate::require_text("content", &req.content)?;

		Ok(messages::insert_message(
			&self.db.pool,
			&NewMessage {
				conversation_id,
				role: req.role.as_deref(),
				content: &req.content,
			},
		)
		.await?)
	}

	pub async fn get_message(&self, message_id: i64) -> Result<Message> {
		messages::get_message(&self.db.pool, message_id)
			.await?
			.ok_or_else(|| message_not_found(message_id))
	}

	/// Oldest first.
	pub async fn list_messages(
		&self,
		conversation_id: i64,
		req: PageRequest,
	) -> Result<ListResponse<Message>> {
		let page = self.page(&req)?;

		if !conversations::conversation_exists(&self.db.pool, conversation_id).await? {
			return Err(conversation_not_found(conversation_id));
		}

		let (total, items) = tokio::try_join!(
			messages::count_messages_for_conversation(&self.db.pool, conversation_id),
			messages::list_messages_for_conversation(&self.db.pool, conversation_id, page),
		)?;

		Ok(ListResponse { total, items })
	}

	pub async fn update_message(
		&self,
		message_id: i64,
		req: UpdateMessageRequest,
	) -> Result<Message> {
		if let Some(content) = req.content.as_deref() {
			crate::require_text("content", content)?;
		}

		messages::update_message(
			&self.db.pool,
			message_id,
			&MessagePatch { role: req.role.as_deref(), content: req.content.as_deref() },
		)
		.await?
		.ok_or_else(|| message_not_found(message_id))
	}

	pub async fn delete_message(&self, message_id: i64) -> Result<()> {
		if !messages::delete_message(&self.db.pool, message_id).await? {
			return Err(message_not_found(message_id));
		}

		Ok(())
	}
}

fn message_not_found(message_id: i64) -> Error {
	Error::not_found(format!("Message {message_id} does not exist."))
}
