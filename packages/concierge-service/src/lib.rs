pub mod agent;
pub mod analytics;
pub mod cache;
pub mod conversation;
pub mod latency;
pub mod prompt;
pub mod reconcile;
pub mod retrieval;
pub mod sync;

mod error;

pub use agent::{APOLOGY, CONTEXT_RESET_NOTICE, ChatReply, ChatRequest, TurnOutcome};
pub use analytics::{Analytics, AnalyticsSnapshot};
pub use cache::RetrievalCache;
pub use conversation::{ConversationStore, SessionKey};
pub use error::{Error, Result};
pub use latency::{ComponentLatency, LatencyMonitor};
pub use reconcile::Reconciliation;
pub use sync::{KindReport, SyncReport};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::{Map, Value};
use time::{Date, OffsetDateTime};
use tokio::time::Instant;

use concierge_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use concierge_domain::{
	catalog::{CategoryRecord, ItemRecord, PromotionRecord},
	index::{CollectionInfo, Hit, SearchFilter},
};
use concierge_providers::{embedding, generation};
use concierge_storage::{catalog, chat, db::Db, models::ChatMessage, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, concierge_providers::Result<Vec<Vec<f32>>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system: &'a str,
		prompt: &'a str,
	) -> BoxFuture<'a, concierge_providers::Result<String>>;
}

/// The similarity index the synchronizer writes and the agent reads.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn ensure_collection<'a>(&'a self) -> BoxFuture<'a, concierge_storage::Result<()>>;

	fn upsert<'a>(
		&'a self,
		point_id: u64,
		vector: Vec<f32>,
		payload: Map<String, Value>,
	) -> BoxFuture<'a, concierge_storage::Result<()>>;

	/// Must return an empty list when the collection does not exist yet.
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		limit: u64,
		filter: &'a SearchFilter,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<Hit>>>;

	fn collection_info<'a>(&'a self) -> BoxFuture<'a, concierge_storage::Result<CollectionInfo>>;
}

/// Relational source of truth. `since = None` reads everything.
pub trait CatalogSource
where
	Self: Send + Sync,
{
	fn fetch_items<'a>(
		&'a self,
		since: Option<OffsetDateTime>,
		today: Date,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<ItemRecord>>>;

	fn fetch_categories<'a>(
		&'a self,
		since: Option<OffsetDateTime>,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<CategoryRecord>>>;

	fn fetch_promotions<'a>(
		&'a self,
		since: Option<OffsetDateTime>,
		today: Date,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<PromotionRecord>>>;
}

pub trait ChatHistory
where
	Self: Send + Sync,
{
	fn persist_turns<'a>(
		&'a self,
		messages: Vec<ChatMessage>,
	) -> BoxFuture<'a, concierge_storage::Result<()>>;

	/// Oldest first.
	fn recent_turns<'a>(
		&'a self,
		user_id: &'a str,
		chat_id: &'a str,
		limit: usize,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<ChatMessage>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		generation: Arc<dyn GenerationProvider>,
	) -> Self {
		Self { embedding, generation }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), generation: provider }
	}
}

#[derive(Clone)]
pub struct Backends {
	pub index: Arc<dyn VectorIndex>,
	pub catalog: Arc<dyn CatalogSource>,
	pub history: Arc<dyn ChatHistory>,
}
impl Backends {
	pub fn new(db: Db, qdrant: QdrantStore) -> Self {
		let db = Arc::new(db);

		Self { index: Arc::new(qdrant), catalog: db.clone(), history: db }
	}
}

pub struct ConciergeService {
	pub cfg: Config,
	pub providers: Providers,
	pub backends: Backends,
	pub cache: RetrievalCache,
	pub conversations: ConversationStore,
	pub analytics: Analytics,
}
impl ConciergeService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		Self::with_backends(cfg, Providers::default(), Backends::new(db, qdrant))
	}

	pub fn with_backends(cfg: Config, providers: Providers, backends: Backends) -> Self {
		let cache = RetrievalCache::new(Duration::from_secs(cfg.retrieval.cache_ttl_seconds));
		let conversations = ConversationStore::new(
			cfg.conversation.window_turns,
			cfg.conversation.max_sessions,
			Duration::from_secs(cfg.conversation.idle_ttl_seconds),
		);

		Self { cfg, providers, backends, cache, conversations, analytics: Analytics::default() }
	}

	/// Drops idle sessions and expired cache entries. Returns `(sessions, cache_entries)` removed.
	pub fn run_maintenance(&self) -> (usize, usize) {
		let sessions = self.conversations.evict_idle();
		let entries = self.cache.purge_expired();

		if sessions > 0 || entries > 0 {
			tracing::debug!(sessions, cache_entries = entries, "Maintenance evicted stale state.");
		}

		(sessions, entries)
	}

	pub(crate) async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let texts = vec![text.to_string()];
		let vectors = self
			.timed(
				"embedding",
				self.cfg.agent.embed_timeout_ms,
				self.providers.embedding.embed(&self.cfg.providers.embedding, &texts),
			)
			.await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, concierge_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system: &'a str,
		prompt: &'a str,
	) -> BoxFuture<'a, concierge_providers::Result<String>> {
		Box::pin(generation::generate(cfg, system, prompt))
	}
}

impl VectorIndex for QdrantStore {
	fn ensure_collection<'a>(&'a self) -> BoxFuture<'a, concierge_storage::Result<()>> {
		Box::pin(QdrantStore::ensure_collection(self))
	}

	fn upsert<'a>(
		&'a self,
		point_id: u64,
		vector: Vec<f32>,
		payload: Map<String, Value>,
	) -> BoxFuture<'a, concierge_storage::Result<()>> {
		Box::pin(self.upsert_point(point_id, vector, payload))
	}

	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		limit: u64,
		filter: &'a SearchFilter,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<Hit>>> {
		Box::pin(QdrantStore::search(self, vector, limit, filter))
	}

	fn collection_info<'a>(&'a self) -> BoxFuture<'a, concierge_storage::Result<CollectionInfo>> {
		Box::pin(QdrantStore::collection_info(self))
	}
}

impl CatalogSource for Db {
	fn fetch_items<'a>(
		&'a self,
		since: Option<OffsetDateTime>,
		today: Date,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<ItemRecord>>> {
		Box::pin(catalog::load_items(&self.pool, since, today))
	}

	fn fetch_categories<'a>(
		&'a self,
		since: Option<OffsetDateTime>,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<CategoryRecord>>> {
		Box::pin(catalog::load_categories(&self.pool, since))
	}

	fn fetch_promotions<'a>(
		&'a self,
		since: Option<OffsetDateTime>,
		today: Date,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<PromotionRecord>>> {
		Box::pin(catalog::load_promotions(&self.pool, since, today))
	}
}

impl ChatHistory for Db {
	fn persist_turns<'a>(
		&'a self,
		messages: Vec<ChatMessage>,
	) -> BoxFuture<'a, concierge_storage::Result<()>> {
		Box::pin(async move {
			for message in &messages {
				chat::insert_chat_message(&self.pool, message).await?;
			}

			Ok(())
		})
	}

	fn recent_turns<'a>(
		&'a self,
		user_id: &'a str,
		chat_id: &'a str,
		limit: usize,
	) -> BoxFuture<'a, concierge_storage::Result<Vec<ChatMessage>>> {
		let limit = i64::try_from(limit).unwrap_or(i64::MAX);

		Box::pin(chat::recent_chat_messages(&self.pool, user_id, chat_id, limit))
	}
}

impl ConciergeService {
	/// Bounds an external call and records its latency. Elapsing maps to [`Error::Timeout`].
	pub(crate) async fn timed<T, E, F>(
		&self,
		operation: &'static str,
		timeout_ms: u64,
		fut: F,
	) -> Result<T>
	where
		F: Future<Output = std::result::Result<T, E>>,
		Error: From<E>,
	{
		let started = Instant::now();
		let outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await;
		let elapsed = started.elapsed();

		self.analytics.latency.record(operation, elapsed, outcome.is_err());

		tracing::debug!(
			operation,
			elapsed_ms = latency::millis(elapsed),
			timed_out = outcome.is_err(),
			"External call finished."
		);

		match outcome {
			Ok(result) => result.map_err(Error::from),
			Err(_) => Err(Error::Timeout { operation }),
		}
	}
}
