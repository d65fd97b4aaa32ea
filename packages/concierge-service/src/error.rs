pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	/// The generation prompt did not fit the model's context window.
	#[error("Context too long: {message}")]
	ContextTooLong { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Timed out waiting for {operation}.")]
	Timeout { operation: &'static str },
}
impl From<concierge_storage::Error> for Error {
	fn from(err: concierge_storage::Error) -> Self {
		match err {
			concierge_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			concierge_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			concierge_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}

impl From<concierge_providers::Error> for Error {
	fn from(err: concierge_providers::Error) -> Self {
		match err {
			concierge_providers::Error::ContextTooLong { message } =>
				Self::ContextTooLong { message },
			other => Self::Provider { message: other.to_string() },
		}
	}
}

impl From<concierge_domain::Error> for Error {
	fn from(err: concierge_domain::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
