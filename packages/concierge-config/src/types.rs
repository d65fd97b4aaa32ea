use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub conversation: Conversation,
	pub agent: Agent,
	#[serde(default)]
	pub sync: SyncSchedule,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	/// Optional. Blank values are treated as unset.
	#[serde(default)]
	pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_output_tokens: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Retrieval {
	#[serde(default = "default_top_k")]
	pub top_k: u32,
	#[serde(default = "default_promotion_top_k")]
	pub promotion_top_k: u32,
	#[serde(default = "default_cache_ttl_seconds")]
	pub cache_ttl_seconds: u64,
	/// Embedded in place of an empty promotion question.
	#[serde(default = "default_promotion_fallback_query")]
	pub promotion_fallback_query: String,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			top_k: default_top_k(),
			promotion_top_k: default_promotion_top_k(),
			cache_ttl_seconds: default_cache_ttl_seconds(),
			promotion_fallback_query: default_promotion_fallback_query(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Conversation {
	#[serde(default = "default_window_turns")]
	pub window_turns: usize,
	#[serde(default = "default_max_sessions")]
	pub max_sessions: usize,
	#[serde(default = "default_idle_ttl_seconds")]
	pub idle_ttl_seconds: u64,
	/// Longer messages are never treated as follow-ups on the remembered item.
	#[serde(default = "default_follow_up_max_words")]
	pub follow_up_max_words: usize,
}
impl Default for Conversation {
	fn default() -> Self {
		Self {
			window_turns: default_window_turns(),
			max_sessions: default_max_sessions(),
			idle_ttl_seconds: default_idle_ttl_seconds(),
			follow_up_max_words: default_follow_up_max_words(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Agent {
	pub assistant_name: String,
	pub embed_timeout_ms: u64,
	pub search_timeout_ms: u64,
	pub generation_timeout_ms: u64,
	#[serde(default = "default_true")]
	pub sales_suggestions: bool,
}

#[derive(Debug, Deserialize)]
pub struct SyncSchedule {
	#[serde(default = "default_sync_interval_seconds")]
	pub interval_seconds: u64,
	#[serde(default = "default_initial_lookback_hours")]
	pub initial_lookback_hours: u64,
}
impl Default for SyncSchedule {
	fn default() -> Self {
		Self {
			interval_seconds: default_sync_interval_seconds(),
			initial_lookback_hours: default_initial_lookback_hours(),
		}
	}
}

fn default_top_k() -> u32 {
	5
}

fn default_promotion_top_k() -> u32 {
	10
}

fn default_cache_ttl_seconds() -> u64 {
	600
}

fn default_promotion_fallback_query() -> String {
	"promotions discounts special offers on courses".to_string()
}

fn default_window_turns() -> usize {
	4
}

fn default_max_sessions() -> usize {
	10_000
}

fn default_idle_ttl_seconds() -> u64 {
	86_400
}

fn default_follow_up_max_words() -> usize {
	6
}

fn default_true() -> bool {
	true
}

fn default_sync_interval_seconds() -> u64 {
	300
}

fn default_initial_lookback_hours() -> u64 {
	24
}
