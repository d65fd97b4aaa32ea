//! One conversational turn: classify, ground, generate, remember.
//!
//! Turns of one session are serialized by the session mutex. Every failure below the top level is
//! turned into a user-facing reply, so `handle_message` never returns an error.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use concierge_domain::{
	catalog::RecordKind,
	intent::{self, DetailField, Intent},
	sales,
};
use concierge_storage::models::ChatMessage;

use crate::{
	ConciergeService, Error, Result,
	conversation::{Conversation, Role, SessionKey, Turn},
	prompt::{self, PromptParts},
	latency::{self, TURN},
	reconcile::{Reconciliation, ResolvedItem},
};

pub const APOLOGY: &str =
	"Sorry, something went wrong on our side. Please try again in a moment.";
pub const CONTEXT_RESET_NOTICE: &str = "Our conversation grew too long for me to follow, so I have \
reset it. Could you ask your question again?";

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
	pub user_id: String,
	pub chat_id: String,
	pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
	Answered,
	ContextReset,
	Apology,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatReply {
	pub reply: String,
	pub outcome: TurnOutcome,
	pub route: &'static str,
	pub kind: Option<RecordKind>,
}

enum Grounding {
	Retrieved(Reconciliation),
	Remembered { field: DetailField, item: ResolvedItem },
	Unavailable,
}
impl Grounding {
	fn context_text(&self) -> String {
		match self {
			Self::Retrieved(reconciliation) => reconciliation.context_text(),
			Self::Remembered { item, .. } => item.block.clone(),
			Self::Unavailable => prompt::UNAVAILABLE_CONTEXT.to_string(),
		}
	}

	fn focus(&self) -> Option<DetailField> {
		match self {
			Self::Remembered { field, .. } => Some(*field),
			_ => None,
		}
	}

	fn kind(&self) -> Option<RecordKind> {
		match self {
			Self::Retrieved(reconciliation) => reconciliation.kind(),
			Self::Remembered { .. } => Some(RecordKind::Item),
			Self::Unavailable => None,
		}
	}

	fn resolved_item(&self) -> Option<&ResolvedItem> {
		match self {
			Self::Retrieved(reconciliation) => reconciliation.single_item(),
			Self::Remembered { item, .. } => Some(item),
			Self::Unavailable => None,
		}
	}
}

impl ConciergeService {
	pub async fn handle_message(&self, req: ChatRequest) -> ChatReply {
		let started = Instant::now();
		let key = SessionKey::new(req.user_id.as_str(), req.chat_id.as_str());
		let session = self.conversations.session(&key);
		let mut conversation = session.lock().await;

		if !conversation.is_hydrated() {
			self.rehydrate(&key, &mut conversation).await;
		}

		self.analytics.record_message(&req.message);

		let summary = conversation.summary();
		let user_turn = Turn::now(Role::User, req.message.as_str());

		conversation.push(user_turn.clone());

		let reply = self.answer(&req.message, &mut conversation, &user_turn, summary).await;
		let bot_turn = Turn::now(Role::Bot, reply.reply.as_str());

		conversation.push(bot_turn.clone());

		drop(conversation);

		self.persist_in_background(&key, [user_turn, bot_turn]);

		let elapsed = started.elapsed();

		self.analytics.latency.record(TURN, elapsed, false);

		tracing::info!(
			route = reply.route,
			outcome = ?reply.outcome,
			elapsed_ms = latency::millis(elapsed),
			"Chat turn completed."
		);

		reply
	}

	pub async fn reset_conversation(&self, user_id: &str, chat_id: &str) {
		self.conversations.reset(&SessionKey::new(user_id, chat_id)).await;

		tracing::info!(user_id, chat_id, "Conversation reset.");
	}

	async fn answer(
		&self,
		message: &str,
		conversation: &mut Conversation,
		user_turn: &Turn,
		summary: Option<String>,
	) -> ChatReply {
		let intent = intent::classify(
			message,
			conversation.last_item().is_some(),
			self.cfg.conversation.follow_up_max_words,
		);
		let route = route_name(intent);
		let grounding = self.ground(intent, message, conversation.last_item()).await;
		let context = grounding.context_text();
		let sales_guidance =
			if self.cfg.agent.sales_suggestions { sales::suggestions(message) } else { None };
		let system = prompt::system_instructions(&self.cfg.agent.assistant_name);
		let mut parts = PromptParts {
			context: &context,
			conversation: summary.as_deref(),
			sales: sales_guidance.as_deref(),
			focus: grounding.focus(),
			message,
		};
		let finish = |text: String, outcome: TurnOutcome| ChatReply {
			reply: text,
			outcome,
			route,
			kind: grounding.kind(),
		};
		let generated = match self.generate(&system, &prompt::build_prompt(&parts)).await {
			Err(Error::ContextTooLong { message: reason }) => {
				tracing::warn!(
					route,
					reason = %reason,
					"Generation context too long. Resetting conversation and retrying once."
				);

				conversation.clear();
				conversation.push(user_turn.clone());

				parts.conversation = None;

				match self.generate(&system, &prompt::build_prompt(&parts)).await {
					Ok(text) => text,
					Err(err) => {
						tracing::warn!(route, error = %err, "Generation retry failed after context reset.");

						return finish(CONTEXT_RESET_NOTICE.to_string(), TurnOutcome::ContextReset);
					},
				}
			},
			Err(err) => {
				tracing::error!(route, error = %err, "Generation failed.");

				return finish(APOLOGY.to_string(), TurnOutcome::Apology);
			},
			Ok(text) => text,
		};

		if let Some(item) = grounding.resolved_item() {
			conversation.remember_item(item.clone());
		}

		finish(generated, TurnOutcome::Answered)
	}

	async fn ground(
		&self,
		intent: Intent,
		message: &str,
		last_item: Option<&ResolvedItem>,
	) -> Grounding {
		let result = match (intent, last_item) {
			(Intent::FollowUp(field), Some(item)) =>
				return Grounding::Remembered { field, item: item.clone() },
			(Intent::Promotions, _) => self.retrieve_promotions(message).await,
			(Intent::FollowUp(_), None) | (Intent::General, _) => self.retrieve(message).await,
		};

		match result {
			Ok(reconciliation) => Grounding::Retrieved(reconciliation),
			Err(err) => {
				tracing::warn!(
					route = route_name(intent),
					error = %err,
					"Retrieval failed. Answering without catalog context."
				);

				Grounding::Unavailable
			},
		}
	}

	async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
		let text = self
			.timed(
				"generation",
				self.cfg.agent.generation_timeout_ms,
				self.providers.generation.generate(&self.cfg.providers.llm, system, prompt),
			)
			.await?;
		let text = text.trim();

		if text.is_empty() {
			return Err(Error::Provider { message: "Generation returned an empty reply.".to_string() });
		}

		Ok(text.to_string())
	}

	async fn rehydrate(&self, key: &SessionKey, conversation: &mut Conversation) {
		let recent = self
			.timed(
				"chat history",
				self.cfg.agent.search_timeout_ms,
				self.backends.history.recent_turns(
					&key.user_id,
					&key.chat_id,
					self.cfg.conversation.window_turns,
				),
			)
			.await;

		match recent {
			Ok(messages) =>
				for message in messages {
					let Some(role) = Role::parse(&message.role) else {
						continue;
					};

					conversation.push(Turn { role, text: message.content, at: message.created_at });
				},
			Err(err) => {
				tracing::warn!(user_id = %key.user_id, error = %err, "Failed to rehydrate conversation.");
			},
		}

		conversation.mark_hydrated();
	}

	fn persist_in_background(&self, key: &SessionKey, turns: [Turn; 2]) {
		let history = self.backends.history.clone();
		let messages = turns
			.into_iter()
			.map(|turn| ChatMessage {
				message_id: Uuid::new_v4(),
				user_id: key.user_id.clone(),
				chat_id: key.chat_id.clone(),
				role: turn.role.as_str().to_string(),
				content: turn.text,
				created_at: turn.at,
			})
			.collect::<Vec<_>>();
		let user_id = key.user_id.clone();

		tokio::spawn(async move {
			if let Err(err) = history.persist_turns(messages).await {
				tracing::warn!(user_id = %user_id, error = %err, "Failed to persist chat turns.");
			}
		});
	}
}

fn route_name(intent: Intent) -> &'static str {
	match intent {
		Intent::Promotions => "promotions",
		Intent::FollowUp(_) => "follow_up",
		Intent::General => "general",
	}
}
