use std::{
	sync::{Arc, atomic::Ordering},
	time::Duration as StdDuration,
};

use serde_json::Value;
use time::{Duration, OffsetDateTime};

use concierge_domain::catalog::{
	CategoryRecord, ItemRecord, LinkedItem, PromotionRecord, RecordKind, keys,
};
use concierge_service::Error;

use super::{FakeCatalog, FakeIndex, Harness, MemoryHistory};

fn item(id: i64, capacity: i64) -> ItemRecord {
	ItemRecord {
		id,
		title: format!("Curso {id}"),
		description: Some("Curso práctico.".to_string()),
		level: Some("principiante".to_string()),
		language: Some("Español".to_string()),
		price: 25.0,
		capacity,
		category_id: Some(1),
		category_name: Some("Programación".to_string()),
		promotions: Vec::new(),
	}
}

fn category(id: i64) -> CategoryRecord {
	CategoryRecord { id, name: "Programación".to_string(), description: None }
}

fn promotion(id: i64, starts_in_days: i64, ends_in_days: i64) -> PromotionRecord {
	let today = OffsetDateTime::now_utc().date();

	PromotionRecord {
		id,
		name: format!("Promo {id}"),
		description: None,
		discount_percent: 15.0,
		starts_on: today + Duration::days(starts_in_days),
		ends_on: today + Duration::days(ends_in_days),
		items: vec![LinkedItem { title: "Curso 1".to_string(), price: 25.0 }],
	}
}

fn seeded_harness(index: FakeIndex) -> Harness {
	Harness::build(
		index,
		FakeCatalog::new(
			vec![item(1, 3), item(2, 0)],
			vec![category(1)],
			vec![promotion(1, -1, 1), promotion(2, -10, -1)],
		),
		Arc::new(MemoryHistory::new()),
	)
}

#[tokio::test]
async fn full_sync_is_idempotent() {
	let harness = seeded_harness(FakeIndex::new());
	let first = harness.service.sync_all().await.expect("first sync");
	let snapshot = harness.index.points.lock().expect("points lock").clone();
	let second = harness.service.sync_all().await.expect("second sync");

	assert_eq!(first, second);
	assert_eq!(first.synced_count, 5);
	assert_eq!(first.failed_count, 0);
	assert_eq!(first.kind(RecordKind::Item).map(|report| report.synced), Some(2));
	assert_eq!(first.kind(RecordKind::Category).map(|report| report.synced), Some(1));
	assert_eq!(first.kind(RecordKind::Promotion).map(|report| report.synced), Some(2));
	assert_eq!(*harness.index.points.lock().expect("points lock"), snapshot);
	assert_eq!(
		snapshot.keys().copied().collect::<Vec<_>>(),
		vec![1, 2, 1_000_001, 2_000_001, 2_000_002]
	);
}

#[tokio::test]
async fn full_sync_creates_the_collection() {
	let harness = seeded_harness(FakeIndex::new());

	assert!(!harness.service.sync_status().await.expect("status").exists);

	harness.service.sync_all().await.expect("sync");

	let status = harness.service.sync_status().await.expect("status");

	assert!(status.exists);
	assert_eq!(status.points_count, 5);
}

#[tokio::test]
async fn derived_flags_are_recomputed_on_every_sync() {
	let harness = seeded_harness(FakeIndex::new());

	harness.service.sync_all().await.expect("sync");

	assert_eq!(
		harness.index.point(2).and_then(|p| p.get(keys::AVAILABLE).cloned()),
		Some(Value::Bool(false))
	);
	assert_eq!(
		harness.index.point(2_000_001).and_then(|p| p.get(keys::ACTIVE).cloned()),
		Some(Value::Bool(true))
	);
	assert_eq!(
		harness.index.point(2_000_002).and_then(|p| p.get(keys::ACTIVE).cloned()),
		Some(Value::Bool(false))
	);

	harness.catalog.items.lock().expect("items lock")[1].capacity = 4;

	let since = OffsetDateTime::now_utc() - Duration::hours(1);
	let report = harness.service.sync_incremental(since).await.expect("incremental sync");

	assert_eq!(report.failed_count, 0);
	assert_eq!(
		harness.index.point(2).and_then(|p| p.get(keys::AVAILABLE).cloned()),
		Some(Value::Bool(true))
	);
	assert_eq!(harness.catalog.reads.lock().expect("reads lock").last(), Some(&Some(since)));
}

#[tokio::test]
async fn one_failing_record_does_not_abort_the_batch() {
	let mut index = FakeIndex::new();

	index.fail_upsert_for = Some(1_000_001);

	let harness = seeded_harness(index);
	let report = harness.service.sync_all().await.expect("sync");

	assert_eq!(report.synced_count, 4);
	assert_eq!(report.failed_count, 1);
	assert_eq!(report.kind(RecordKind::Category).map(|report| report.failed), Some(1));
	assert!(harness.index.point(1_000_001).is_none());
	assert!(harness.index.point(2_000_002).is_some());
}

#[tokio::test]
async fn unreachable_catalog_fails_the_run() {
	let harness = seeded_harness(FakeIndex::new());

	harness.catalog.unreachable.store(true, Ordering::SeqCst);

	assert!(harness.service.sync_all().await.is_err());
	assert!(harness.index.points.lock().expect("points lock").is_empty());
}

#[tokio::test]
async fn incremental_sync_requires_an_existing_collection() {
	let harness = seeded_harness(FakeIndex::new());
	let result = harness.service.sync_incremental(OffsetDateTime::now_utc()).await;

	assert!(matches!(result, Err(Error::InvalidRequest { .. })));
	assert_eq!(harness.embedding.count(), 0);
}

#[tokio::test]
async fn sync_runs_alongside_chat_turns() {
	let harness = seeded_harness(FakeIndex::new());
	let service = harness.service.clone();
	let sync = tokio::spawn(async move { service.sync_all().await });
	let reply = tokio::time::timeout(
		StdDuration::from_secs(5),
		harness.service.handle_message(concierge_service::ChatRequest {
			user_id: "u-1".to_string(),
			chat_id: "chat-1".to_string(),
			message: "Hola".to_string(),
		}),
	)
	.await
	.expect("Chat turn must not wait for the sync.");

	assert_eq!(reply.outcome, concierge_service::TurnOutcome::Answered);
	assert_eq!(sync.await.expect("sync task").expect("sync").synced_count, 5);
}
