use serde::Deserialize;
use tracing::info;

use medi_storage::{
	conversations::{self, ConversationPatch, NewConversation},
	models::Conversation,
};

use crate::{Error, ListResponse, MediService, PageRequest, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateConversationRequest {
	pub title: String,
	pub department: Option<String>,
	pub patient_id: Option<i64>,
	pub user_id: Option<i64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateConversationRequest {
	pub title: Option<String>,
	pub department: Option<String>,
	pub patient_id: Option<i64>,
	pub user_id: Option<i64>,
}

impl MediService {
	/// A new conversation starts with empty progress at version 0.
	pub async fn create_conversation(
		&self,
		req: CreateConversationRequest,
	) -> Result<Conversation> {
		crate::require_text("title", &req.title)?;

		let conversation = conversations::insert_conversation(
			&self.db.pool,
			&NewConversation {
				title: req.title.trim(),
				department: req.department.as_deref(),
				patient_id: req.patient_id,
				user_id: req.user_id,
			},
		)
		.await?;

		info!(session_id = conversation.id, "Conversation started.");

		Ok(conversation)
	}

	pub async fn get_conversation(&self, conversation_id: i64) -> Result<Conversation> {
		conversations::get_conversation(&self.db.pool, conversation_id)
			.await?
			.ok_or_else(|| conversation_not_found(conversation_id))
	}

	pub async fn list_conversations(
		&self,
		req: PageRequest,
	) -> Result<ListResponse<Conversation>> {
		let page = self.page(&req)?;
		let (total, items) = tokio::try_join!(
			conversations::count_conversations(&self.db.pool),
			conversations::list_conversations(&self.db.pool, page),
		)?;

		Ok(ListResponse { total, items })
	}

	/// Metadata only. Progress changes go through `replace_progress` or `consult`.
	pub async fn update_conversation(
		&self,
		conversation_id: i64,
		req: UpdateConversationRequest,
	) -> Result<Conversation> {
		if let Some(title) = req.title.as_deref() {
			crate::require_text("title", title)?;
		}

		conversations::update_conversation(
			&self.db.pool,
			conversation_id,
			&ConversationPatch {
				title: req.title.as_deref().map(str::trim),
				department: req.department.as_deref(),
				patient_id: req.patient_id,
				user_id: req.user_id,
			},
		)
		.await?
		.ok_or_else(|| conversation_not_found(conversation_id))
	}

	pub async fn delete_conversation(&self, conversation_id: i64) -> Result<()> {
		if !conversations::delete_conversation(&self.db.pool, conversation_id).await? {
			return Err(conversation_not_found(conversation_id));
		}

		Ok(())
	}
}

pub(crate) fn conversation_not_found(conversation_id: i64) -> Error {
	Error::not_found(format!("Conversation {conversation_id} does not exist."))
}
