use concierge_domain::{
	catalog::{RecordKind, keys},
	index::SearchFilter,
};

use crate::{
	ConciergeService, Result,
	cache::{self, Route},
	reconcile::{self, Reconciliation},
};

impl ConciergeService {
	/// General catalog lookup over every kind.
	pub async fn retrieve(&self, query: &str) -> Result<Reconciliation> {
		self.retrieve_route(Route::General, query, self.cfg.retrieval.top_k, SearchFilter::new())
			.await
	}

	/// Lookup restricted to promotions running today.
	pub async fn retrieve_promotions(&self, query: &str) -> Result<Reconciliation> {
		let query = if query.trim().is_empty() {
			self.cfg.retrieval.promotion_fallback_query.as_str()
		} else {
			query
		};
		let filter =
			SearchFilter::new().exact(keys::KIND, RecordKind::Promotion).exact(keys::ACTIVE, true);

		self.retrieve_route(Route::Promotions, query, self.cfg.retrieval.promotion_top_k, filter)
			.await
	}

	async fn retrieve_route(
		&self,
		route: Route,
		query: &str,
		limit: u32,
		filter: SearchFilter,
	) -> Result<Reconciliation> {
		let key = cache::cache_key(route, query);

		if let Some(cached) = self.cache.get(&key) {
			tracing::debug!(
				route = route.as_str(),
				key_prefix = cache::cache_key_prefix(&key),
				"Retrieval cache hit."
			);

			return Ok(cached);
		}

		tracing::debug!(
			route = route.as_str(),
			key_prefix = cache::cache_key_prefix(&key),
			"Retrieval cache miss."
		);

		let vector = self.embed_one(query.trim()).await?;
		let hits = self
			.timed(
				"vector search",
				self.cfg.agent.search_timeout_ms,
				self.backends.index.search(vector, u64::from(limit), &filter),
			)
			.await?;
		let reconciliation = reconcile::reconcile(&hits);

		tracing::debug!(
			route = route.as_str(),
			hits = hits.len(),
			kind = ?reconciliation.kind(),
			"Retrieval reconciled."
		);

		self.cache.set(key, reconciliation.clone());

		Ok(reconciliation)
	}
}
