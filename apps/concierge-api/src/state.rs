use std::sync::Arc;

use concierge_service::ConciergeService;
use concierge_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ConciergeService>,
}
impl AppState {
	pub async fn new(config: concierge_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let service = ConciergeService::new(config, db, qdrant);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: ConciergeService) -> Self {
		Self { service: Arc::new(service) }
	}
}
