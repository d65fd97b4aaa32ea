use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::reconcile::Reconciliation;

/// Which retrieval path produced an entry. Part of the key so the same text asked on different
/// paths never shares an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
	General,
	Promotions,
}
impl Route {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::General => "general",
			Self::Promotions => "promotions",
		}
	}
}

struct Entry {
	value: Reconciliation,
	expires_at: Instant,
}

/// Short-lived map from normalized query to reconciled context. Entries are only written after a
/// successful reconciliation and expire after a fixed TTL.
pub struct RetrievalCache {
	entries: DashMap<String, Entry>,
	ttl: Duration,
}
impl RetrievalCache {
	pub fn new(ttl: Duration) -> Self {
		Self { entries: DashMap::new(), ttl }
	}

	pub fn get(&self, key: &str) -> Option<Reconciliation> {
		let now = Instant::now();

		match self.entries.get(key) {
			Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
			Some(_) => {},
			None => return None,
		}

		self.entries.remove_if(key, |_, entry| entry.expires_at <= now);

		None
	}

	pub fn set(&self, key: String, value: Reconciliation) {
		self.entries.insert(key, Entry { value, expires_at: Instant::now() + self.ttl });
	}

	pub fn purge_expired(&self) -> usize {
		let now = Instant::now();
		let before = self.entries.len();

		self.entries.retain(|_, entry| entry.expires_at > now);

		before.saturating_sub(self.entries.len())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// BLAKE3 over the route tag and the trimmed, lower-cased query text.
pub fn cache_key(route: Route, query: &str) -> String {
	let normalized = query.trim().to_lowercase();
	let mut hasher = blake3::Hasher::new();

	hasher.update(route.as_str().as_bytes());
	hasher.update(b"\n");
	hasher.update(normalized.as_bytes());

	hasher.finalize().to_hex().to_string()
}

pub fn cache_key_prefix(key: &str) -> &str {
	let len = key.len().min(12);

	&key[..len]
}
