use serde::{Deserialize, Serialize};

use crate::{Error, MediService, Result};

pub const MAX_EMBED_CHARS: usize = 2_048;

#[derive(Clone, Debug, Deserialize)]
pub struct EmbedRequest {
	pub text: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct EmbedResponse {
	pub text: String,
	pub embedding: Vec<f32>,
	pub dimension: usize,
}

impl MediService {
	/// Embeds one text with the configured provider. No index or session is involved.
	pub async fn embed_text(&self, req: EmbedRequest) -> Result<EmbedResponse> {
		if req.text.trim().is_empty() {
			return Err(Error::invalid_request("text must be non-empty."));
		}
		if req.text.chars().count() > MAX_EMBED_CHARS {
			return Err(Error::invalid_request(format!(
				"text must be at most {MAX_EMBED_CHARS} characters."
			)));
		}

		let embedding = self.retriever().embed_query(&req.text).await?;

		Ok(EmbedResponse { dimension: embedding.len(), embedding, text: req.text })
	}
}
