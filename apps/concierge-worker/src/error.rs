pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Service(#[from] concierge_service::Error),
	#[error(transparent)]
	Storage(#[from] concierge_storage::Error),
}
