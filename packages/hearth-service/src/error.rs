pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Backing store unavailable: {message}")]
	Unavailable { message: String },
	#[error("Operation timed out after {timeout_ms} ms.")]
	Timeout { timeout_ms: u64 },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		match &err {
			sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) =>
				Self::Unavailable { message: err.to_string() },
			sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") =>
				Self::Conflict { message: err.to_string() },
			_ => Self::Storage { message: err.to_string() },
		}
	}
}

impl From<hearth_storage::Error> for Error {
	fn from(err: hearth_storage::Error) -> Self {
		match err {
			hearth_storage::Error::Sqlx(inner) => Self::from(inner),
		}
	}
}
