pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl Error {
	/// Maps constraint violations on insert or update to `Conflict` and `NotFound`.
	pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
		if let Some(db_err) = err.as_database_error() {
			if db_err.is_unique_violation() {
				return Self::Conflict(format!("{what} already exists."));
			}
			if db_err.is_foreign_key_violation() {
				return Self::NotFound(format!("{what} references a missing row."));
			}
		}

		Self::Sqlx(err)
	}
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
