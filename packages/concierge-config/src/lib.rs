mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Agent, Config, Conversation, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers,
	Qdrant, Retrieval, Service, Storage, SyncSchedule,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::Parse { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
		("storage.qdrant.url", &cfg.storage.qdrant.url),
		("storage.qdrant.collection", &cfg.storage.qdrant.collection),
		("agent.assistant_name", &cfg.agent.assistant_name),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if !cfg.providers.llm.temperature.is_finite() || cfg.providers.llm.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number, zero or greater."
				.to_string(),
		});
	}
	if cfg.providers.llm.max_output_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.llm.max_output_tokens must be greater than zero.".to_string(),
		});
	}

	for (label, key) in
		[("embedding", &cfg.providers.embedding.api_key), ("llm", &cfg.providers.llm.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, value) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.llm.timeout_ms", cfg.providers.llm.timeout_ms),
		("agent.embed_timeout_ms", cfg.agent.embed_timeout_ms),
		("agent.search_timeout_ms", cfg.agent.search_timeout_ms),
		("agent.generation_timeout_ms", cfg.agent.generation_timeout_ms),
		("retrieval.cache_ttl_seconds", cfg.retrieval.cache_ttl_seconds),
		("conversation.idle_ttl_seconds", cfg.conversation.idle_ttl_seconds),
		("sync.interval_seconds", cfg.sync.interval_seconds),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.promotion_top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.promotion_top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.promotion_fallback_query.trim().is_empty() {
		return Err(Error::Validation {
			message: "retrieval.promotion_fallback_query must be non-empty.".to_string(),
		});
	}
	if cfg.conversation.window_turns == 0 {
		return Err(Error::Validation {
			message: "conversation.window_turns must be greater than zero.".to_string(),
		});
	}
	if cfg.conversation.max_sessions == 0 {
		return Err(Error::Validation {
			message: "conversation.max_sessions must be greater than zero.".to_string(),
		});
	}
	if cfg.conversation.follow_up_max_words == 0 {
		return Err(Error::Validation {
			message: "conversation.follow_up_max_words must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.qdrant.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.storage.qdrant.api_key = None;
	}

	cfg.providers.embedding.api_base =
		cfg.providers.embedding.api_base.trim_end_matches('/').to_string();
	cfg.providers.llm.api_base = cfg.providers.llm.api_base.trim_end_matches('/').to_string();
	cfg.retrieval.promotion_fallback_query =
		cfg.retrieval.promotion_fallback_query.trim().to_string();
}
