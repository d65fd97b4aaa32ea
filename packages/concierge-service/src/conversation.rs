use std::{collections::VecDeque, sync::Arc, time::Duration};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::{sync::Mutex, time::Instant};

use crate::reconcile::ResolvedItem;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
	pub user_id: String,
	pub chat_id: String,
}
impl SessionKey {
	pub fn new(user_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
		Self { user_id: user_id.into(), chat_id: chat_id.into() }
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	User,
	Bot,
}
impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Bot => "bot",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"user" => Some(Self::User),
			"bot" => Some(Self::Bot),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
	pub role: Role,
	pub text: String,
	pub at: OffsetDateTime,
}
impl Turn {
	pub fn now(role: Role, text: impl Into<String>) -> Self {
		Self { role, text: text.into(), at: OffsetDateTime::now_utc() }
	}
}

/// Per-session sliding window plus the last item a retrieval resolved to.
#[derive(Debug)]
pub struct Conversation {
	window: VecDeque<Turn>,
	bound: usize,
	last_item: Option<ResolvedItem>,
	hydrated: bool,
}
impl Conversation {
	pub fn new(bound: usize) -> Self {
		Self { window: VecDeque::with_capacity(bound + 1), bound, last_item: None, hydrated: false }
	}

	pub fn push(&mut self, turn: Turn) {
		self.window.push_back(turn);

		while self.window.len() > self.bound {
			self.window.pop_front();
		}
	}

	pub fn turns(&self) -> impl Iterator<Item = &Turn> {
		self.window.iter()
	}

	pub fn len(&self) -> usize {
		self.window.len()
	}

	pub fn is_empty(&self) -> bool {
		self.window.is_empty()
	}

	pub fn last_item(&self) -> Option<&ResolvedItem> {
		self.last_item.as_ref()
	}

	pub fn remember_item(&mut self, item: ResolvedItem) {
		self.last_item = Some(item);
	}

	/// Forgets turns and the remembered item. The session stays hydrated.
	pub fn clear(&mut self) {
		self.window.clear();
		self.last_item = None;
	}

	pub fn is_hydrated(&self) -> bool {
		self.hydrated
	}

	pub fn mark_hydrated(&mut self) {
		self.hydrated = true;
	}

	/// `None` when there is nothing worth summarizing.
	pub fn summary(&self) -> Option<String> {
		let mut lines = self
			.window
			.iter()
			.map(|turn| {
				let speaker = match turn.role {
					Role::User => "Customer",
					Role::Bot => "Assistant",
				};

				format!("{speaker}: {}", turn.text.trim())
			})
			.collect::<Vec<_>>();

		if let Some(item) = &self.last_item {
			lines.push(format!("Last referenced item: {}", item.title));
		}

		if lines.is_empty() { None } else { Some(lines.join("\n")) }
	}
}

struct Session {
	conversation: Arc<Mutex<Conversation>>,
	touched: Instant,
}

/// Concurrent session map. Each session sits behind its own async mutex, so turns of one session
/// are applied in lock order while other sessions proceed independently.
pub struct ConversationStore {
	sessions: DashMap<SessionKey, Session>,
	window_turns: usize,
	max_sessions: usize,
	idle_ttl: Duration,
}
impl ConversationStore {
	pub fn new(window_turns: usize, max_sessions: usize, idle_ttl: Duration) -> Self {
		Self { sessions: DashMap::new(), window_turns, max_sessions, idle_ttl }
	}

	/// Returns the session for `key`, creating it when absent. Creation may evict the least
	/// recently used other session once `max_sessions` is exceeded.
	pub fn session(&self, key: &SessionKey) -> Arc<Mutex<Conversation>> {
		let now = Instant::now();
		let conversation = {
			let mut session = self.sessions.entry(key.clone()).or_insert_with(|| Session {
				conversation: Arc::new(Mutex::new(Conversation::new(self.window_turns))),
				touched: now,
			});

			session.touched = now;

			session.conversation.clone()
		};

		if self.sessions.len() > self.max_sessions {
			self.evict_least_recent(key);
		}

		conversation
	}

	pub fn contains(&self, key: &SessionKey) -> bool {
		self.sessions.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}

	/// Clears a session on demand. The cleared session is not rebuilt from chat history.
	pub async fn reset(&self, key: &SessionKey) {
		let session = self.session(key);
		let mut conversation = session.lock().await;

		conversation.clear();
		conversation.mark_hydrated();
	}

	/// Removes sessions idle for longer than the TTL. Sessions held by an in-flight turn are kept.
	pub fn evict_idle(&self) -> usize {
		let now = Instant::now();
		let before = self.sessions.len();

		self.sessions.retain(|_, session| {
			now.duration_since(session.touched) < self.idle_ttl
				|| Arc::strong_count(&session.conversation) > 1
		});

		before.saturating_sub(self.sessions.len())
	}

	/// Sessions held by an in-flight turn are never evicted, so the store may stay over capacity
	/// until those turns finish.
	fn evict_least_recent(&self, keep: &SessionKey) {
		while self.sessions.len() > self.max_sessions {
			let oldest = self
				.sessions
				.iter()
				.filter(|entry| {
					entry.key() != keep && Arc::strong_count(&entry.value().conversation) == 1
				})
				.min_by_key(|entry| entry.value().touched)
				.map(|entry| entry.key().clone());
			let Some(oldest) = oldest else {
				break;
			};

			tracing::debug!(user_id = %oldest.user_id, "Evicting least recently used session.");

			self.sessions.remove(&oldest);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn window_keeps_the_most_recent_turns_in_order() {
		let mut conversation = Conversation::new(4);

		for index in 0..10 {
			let role = if index % 2 == 0 { Role::User } else { Role::Bot };

			conversation.push(Turn::now(role, format!("turn {index}")));

			assert!(conversation.len() <= 4);
		}

		let texts = conversation.turns().map(|turn| turn.text.as_str()).collect::<Vec<_>>();

		assert_eq!(texts, vec!["turn 6", "turn 7", "turn 8", "turn 9"]);
	}

	#[test]
	fn summary_mentions_the_remembered_item() {
		let mut conversation = Conversation::new(4);

		assert_eq!(conversation.summary(), None);

		conversation.push(Turn::now(Role::User, "Hola"));
		conversation.remember_item(ResolvedItem {
			point_id: 1,
			title: "Python desde cero".to_string(),
			block: "Title: Python desde cero".to_string(),
		});

		let summary = conversation.summary().expect("Expected a summary.");

		assert!(summary.starts_with("Customer: Hola"));
		assert!(summary.ends_with("Last referenced item: Python desde cero"));
	}

	#[tokio::test]
	async fn same_key_shares_one_session() {
		let store = ConversationStore::new(4, 10, Duration::from_secs(60));
		let key = SessionKey::new("u-1", "c-1");

		store.session(&key).lock().await.push(Turn::now(Role::User, "hi"));

		assert_eq!(store.session(&key).lock().await.len(), 1);
		assert_eq!(store.session(&SessionKey::new("u-1", "c-2")).lock().await.len(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn least_recent_session_is_evicted_over_capacity() {
		let store = ConversationStore::new(4, 2, Duration::from_secs(60));
		let first = SessionKey::new("u-1", "c");
		let second = SessionKey::new("u-2", "c");
		let third = SessionKey::new("u-3", "c");

		store.session(&first);
		tokio::time::advance(Duration::from_secs(1)).await;
		store.session(&second);
		tokio::time::advance(Duration::from_secs(1)).await;
		store.session(&first);
		tokio::time::advance(Duration::from_secs(1)).await;
		store.session(&third);

		assert_eq!(store.len(), 2);
		assert!(store.contains(&first));
		assert!(!store.contains(&second));
		assert!(store.contains(&third));
	}

	#[tokio::test(start_paused = true)]
	async fn capacity_eviction_skips_sessions_with_a_turn_in_flight() {
		let store = ConversationStore::new(4, 1, Duration::from_secs(60));
		let busy = SessionKey::new("u-1", "c");
		let other = SessionKey::new("u-2", "c");
		let held = store.session(&busy);
		let guard = held.lock().await;

		tokio::time::advance(Duration::from_secs(1)).await;
		store.session(&other);

		assert!(store.contains(&busy));

		let again = store.session(&busy);

		assert!(Arc::ptr_eq(&held, &again));
		assert!(again.try_lock().is_err());

		drop(guard);
		drop(again);
		drop(held);
		tokio::time::advance(Duration::from_secs(1)).await;
		store.session(&SessionKey::new("u-3", "c"));

		assert_eq!(store.len(), 1);
		assert!(!store.contains(&busy));
		assert!(!store.contains(&other));
	}

	#[tokio::test(start_paused = true)]
	async fn idle_sessions_are_evicted_unless_in_use() {
		let store = ConversationStore::new(4, 10, Duration::from_secs(30));
		let idle = SessionKey::new("u-1", "c");
		let busy = SessionKey::new("u-2", "c");

		store.session(&idle);

		let held = store.session(&busy);

		tokio::time::advance(Duration::from_secs(31)).await;

		assert_eq!(store.evict_idle(), 1);
		assert!(!store.contains(&idle));
		assert!(store.contains(&busy));

		drop(held);
	}

	#[tokio::test]
	async fn reset_clears_turns_and_memory() {
		let store = ConversationStore::new(4, 10, Duration::from_secs(60));
		let key = SessionKey::new("u-1", "c-1");

		{
			let session = store.session(&key);
			let mut conversation = session.lock().await;

			conversation.push(Turn::now(Role::User, "hi"));
			conversation.remember_item(ResolvedItem {
				point_id: 1,
				title: "Python".to_string(),
				block: "Title: Python".to_string(),
			});
		}

		store.reset(&key).await;

		let session = store.session(&key);
		let conversation = session.lock().await;

		assert!(conversation.is_empty());
		assert!(conversation.last_item().is_none());
		assert!(conversation.is_hydrated());
	}
}
