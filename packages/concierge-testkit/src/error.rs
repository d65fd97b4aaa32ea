pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures while provisioning or tearing down test backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Message(String),
	#[error("Postgres fixture failed: {0}")]
	Postgres(#[from] sqlx::Error),
	#[error("Qdrant cleanup failed for {collection}: {message}")]
	QdrantCleanup { collection: String, message: String },
}
