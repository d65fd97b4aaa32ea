use std::{sync::Arc, time::Duration};

use concierge_domain::{
	catalog::{RecordKind, keys},
	index::{MatchValue, SearchFilter},
};
use concierge_service::{
	APOLOGY, CONTEXT_RESET_NOTICE, ChatRequest, SessionKey, TurnOutcome, prompt,
};

use super::{FakeCatalog, FakeIndex, Harness, MemoryHistory, Step, category_hit, item_hit};

fn request(user_id: &str, message: &str) -> ChatRequest {
	ChatRequest {
		user_id: user_id.to_string(),
		chat_id: "chat-1".to_string(),
		message: message.to_string(),
	}
}

async fn wait_for_history(history: &MemoryHistory, expected: usize) {
	for _ in 0..100 {
		if history.len() >= expected {
			return;
		}

		tokio::time::sleep(Duration::from_millis(5)).await;
	}

	panic!("Expected {expected} persisted messages, found {}.", history.len());
}

#[tokio::test]
async fn beginner_question_grounds_on_item_blocks_only() {
	let harness = Harness::new();

	harness.index.set_hits(vec![
		item_hit(1, "Python desde cero", "principiante"),
		item_hit(2, "HTML y CSS", "principiante"),
		category_hit(1_000_001, "Programación"),
		item_hit(3, "Excel básico", "principiante"),
		item_hit(4, "Fotografía inicial", "principiante"),
	]);

	let reply = harness
		.service
		.handle_message(request("u-1", "¿qué cursos de nivel principiante tienen?"))
		.await;
	let prompt = harness.generation.last_prompt();

	assert_eq!(reply.outcome, TurnOutcome::Answered);
	assert_eq!(reply.kind, Some(RecordKind::Item));
	assert_eq!(reply.reply, "Here is what I found.");
	assert_eq!(prompt.matches("Title: ").count(), 4);

	for title in ["Python desde cero", "HTML y CSS", "Excel básico", "Fotografía inicial"] {
		assert!(prompt.contains(&format!("Title: {title}")), "Missing block for {title}.");
	}

	assert!(!prompt.contains("Category: "));
	assert!(!prompt.contains("Programación courses."));
	assert!(prompt.contains("## Sales guidance"));
}

#[tokio::test]
async fn context_overflow_resets_window_and_retries_once() {
	let harness = Harness::new();
	let key = SessionKey::new("u-1", "chat-1");

	harness.service.handle_message(request("u-1", "Hola, busco cursos de diseño")).await;
	harness.generation.push(Step::ContextTooLong);
	harness.generation.push(Step::Reply("Tenemos cursos de diseño.".to_string()));

	let reply = harness.service.handle_message(request("u-1", "¿Y de fotografía?")).await;

	assert_eq!(reply.outcome, TurnOutcome::Answered);
	assert_eq!(reply.reply, "Tenemos cursos de diseño.");
	assert_eq!(harness.generation.count(), 3);
	assert!(harness.generation.prompt(1).contains("## Conversation so far"));
	assert!(!harness.generation.prompt(2).contains("## Conversation so far"));
	assert!(harness.generation.prompt(2).contains("¿Y de fotografía?"));

	let session = harness.service.conversations.session(&key);
	let conversation = session.lock().await;
	let texts = conversation.turns().map(|turn| turn.text.clone()).collect::<Vec<_>>();

	assert_eq!(
		texts,
		vec!["¿Y de fotografía?".to_string(), "Tenemos cursos de diseño.".to_string()]
	);
}

#[tokio::test]
async fn second_overflow_returns_the_reset_notice() {
	let harness = Harness::new();

	harness.generation.push(Step::ContextTooLong);
	harness.generation.push(Step::ContextTooLong);

	let reply = harness.service.handle_message(request("u-1", "¿Qué cursos tienen?")).await;

	assert_eq!(reply.outcome, TurnOutcome::ContextReset);
	assert_eq!(reply.reply, CONTEXT_RESET_NOTICE);
	assert_eq!(harness.generation.count(), 2);
}

#[tokio::test]
async fn generation_failure_becomes_an_apology() {
	let harness = Harness::new();

	harness.generation.push(Step::Fail);

	let reply = harness.service.handle_message(request("u-1", "¿Qué cursos tienen?")).await;

	assert_eq!(reply.outcome, TurnOutcome::Apology);
	assert_eq!(reply.reply, APOLOGY);
	assert_eq!(harness.generation.count(), 1);
}

#[tokio::test]
async fn retrieval_failure_degrades_to_unavailable_context() {
	let harness = Harness::new();

	harness.embedding.fail_next.store(true, std::sync::atomic::Ordering::SeqCst);

	let reply = harness.service.handle_message(request("u-1", "¿Qué cursos tienen?")).await;

	assert_eq!(reply.outcome, TurnOutcome::Answered);
	assert_eq!(reply.kind, None);
	assert!(harness.generation.last_prompt().contains(prompt::UNAVAILABLE_CONTEXT));
	assert_eq!(harness.index.search_count(), 0);
}

#[tokio::test]
async fn follow_up_reuses_the_remembered_item() {
	let harness = Harness::new();

	harness.index.set_hits(vec![item_hit(7, "Python desde cero", "principiante")]);
	harness.service.handle_message(request("u-1", "¿Tienen un curso de Python?")).await;

	let reply = harness.service.handle_message(request("u-1", "¿Y el precio?")).await;
	let prompt = harness.generation.last_prompt();

	assert_eq!(reply.route, "follow_up");
	assert_eq!(reply.kind, Some(RecordKind::Item));
	assert_eq!(harness.index.search_count(), 1);
	assert!(prompt.contains("Title: Python desde cero"));
	assert!(prompt.contains("asking about the price"));
	assert!(prompt.contains("Last referenced item: Python desde cero"));
}

#[tokio::test]
async fn promotion_question_searches_active_promotions() {
	let harness = Harness::new();

	harness.service.handle_message(request("u-1", "¿Hay alguna promoción?")).await;

	let searches = harness.index.searches.lock().expect("searches lock").clone();
	let expected = SearchFilter::new()
		.exact(keys::KIND, RecordKind::Promotion)
		.exact(keys::ACTIVE, true);

	assert_eq!(searches.len(), 1);
	assert_eq!(searches[0].0, 10);
	assert_eq!(searches[0].1, expected);
	assert_eq!(searches[0].1.must[1].any_of, vec![MatchValue::Bool(true)]);
}

#[tokio::test]
async fn turns_are_persisted_and_rehydrated() {
	let history = Arc::new(MemoryHistory::new());
	let first = Harness::build(FakeIndex::new(), FakeCatalog::empty(), history.clone());

	first.service.handle_message(request("u-1", "Me interesa el curso de Rust")).await;

	wait_for_history(&history, 2).await;

	let second = Harness::build(FakeIndex::new(), FakeCatalog::empty(), history.clone());

	second.service.handle_message(request("u-1", "¿Cuándo empieza?")).await;

	let prompt = second.generation.last_prompt();

	assert!(prompt.contains("Customer: Me interesa el curso de Rust"));
	assert!(prompt.contains("Assistant: Here is what I found."));

	let other_chat = Harness::build(FakeIndex::new(), FakeCatalog::empty(), history.clone());

	other_chat
		.service
		.handle_message(ChatRequest {
			user_id: "u-1".to_string(),
			chat_id: "chat-2".to_string(),
			message: "Hola".to_string(),
		})
		.await;

	assert!(!other_chat.generation.last_prompt().contains("## Conversation so far"));
}

#[tokio::test]
async fn concurrent_turns_for_one_user_keep_the_window_consistent() {
	let harness = Harness::new();
	let mut tasks = Vec::new();

	for index in 0..8 {
		let service = harness.service.clone();

		tasks.push(tokio::spawn(async move {
			service.handle_message(request("u-1", &format!("mensaje {index}"))).await
		}));
	}
	for task in tasks {
		task.await.expect("Turn task panicked.");
	}

	let session = harness.service.conversations.session(&SessionKey::new("u-1", "chat-1"));
	let conversation = session.lock().await;
	let turns = conversation.turns().collect::<Vec<_>>();

	assert_eq!(turns.len(), 4);

	for pair in turns.chunks(2) {
		assert_eq!(pair[0].role, concierge_service::conversation::Role::User);
		assert_eq!(pair[1].role, concierge_service::conversation::Role::Bot);
	}
}

#[tokio::test]
async fn reset_forgets_the_conversation() {
	let harness = Harness::new();

	harness.index.set_hits(vec![item_hit(7, "Python desde cero", "principiante")]);
	harness.service.handle_message(request("u-1", "¿Tienen un curso de Python?")).await;
	harness.service.reset_conversation("u-1", "chat-1").await;

	let reply = harness.service.handle_message(request("u-1", "¿Y el precio?")).await;

	assert_eq!(reply.route, "general");
	assert!(!harness.generation.last_prompt().contains("## Conversation so far"));
	assert_eq!(harness.index.search_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn stalled_generation_times_out_into_the_apology() {
	let harness = Harness::new();

	harness.generation.push(Step::Hang);

	let reply = harness.service.handle_message(request("u-1", "¿Tienen cursos de Excel?")).await;

	assert_eq!(reply.outcome, TurnOutcome::Apology);
	assert_eq!(reply.reply, APOLOGY);
	assert_eq!(harness.generation.count(), 1);

	let latency = harness.service.analytics.snapshot().latency;
	let component = |name: &str| {
		latency.iter().find(|entry| entry.component == name).cloned().expect("component recorded")
	};
	let generation = component("generation");
	let turn = component("turn");

	assert_eq!(generation.calls, 1);
	assert_eq!(generation.timeouts, 1);
	assert!(generation.max_ms >= 1_000);
	assert_eq!(turn.calls, 1);
	assert_eq!(turn.timeouts, 0);
}

#[tokio::test(start_paused = true)]
async fn stalled_embedding_answers_without_catalog_context() {
	let harness = Harness::new();

	harness.index.set_hits(vec![item_hit(1, "Excel básico", "principiante")]);
	harness.embedding.hang_next.store(true, std::sync::atomic::Ordering::SeqCst);

	let reply = harness.service.handle_message(request("u-1", "¿Tienen cursos de Excel?")).await;
	let sent = harness.generation.last_prompt();

	assert_eq!(reply.outcome, TurnOutcome::Answered);
	assert_eq!(reply.kind, None);
	assert_eq!(harness.index.search_count(), 0);
	assert!(sent.contains(prompt::UNAVAILABLE_CONTEXT));
	assert!(!sent.contains("Title: Excel básico"));
}
