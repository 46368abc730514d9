pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid query: {message}")]
	InvalidQuery { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid progress: {message}")]
	InvalidProgress { message: String, unknown_ids: Vec<i64>, duplicate_ids: Vec<i64> },
	#[error("Embedding unavailable: {message}")]
	EmbeddingUnavailable { message: String },
	#[error("Vector index unavailable: {message}")]
	IndexUnavailable { message: String },
	#[error("Upstream {stage} call timed out after {timeout_ms} ms.")]
	UpstreamTimeout { stage: &'static str, timeout_ms: u64 },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Progress of conversation {session_id} changed concurrently.")]
	VersionConflict { session_id: i64 },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	pub(crate) fn invalid_query(message: impl Into<String>) -> Self {
		Self::InvalidQuery { message: message.into() }
	}

	pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}

	pub(crate) fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<medi_storage::Error> for Error {
	fn from(err: medi_storage::Error) -> Self {
		match err {
			medi_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			medi_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			medi_storage::Error::NotFound(message) => Self::NotFound { message },
			medi_storage::Error::Conflict(message) => Self::Conflict { message },
			medi_storage::Error::Qdrant(inner) => Self::IndexUnavailable { message: inner.to_string() },
		}
	}
}
