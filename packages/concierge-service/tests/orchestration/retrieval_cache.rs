use std::{sync::atomic::Ordering, time::Duration};

use concierge_domain::catalog::RecordKind;
use concierge_service::{Error, Reconciliation, reconcile::NO_RESULTS};

use super::{FALLBACK_QUERY, Harness, category_hit, item_hit};

#[tokio::test(start_paused = true)]
async fn identical_queries_share_one_lookup_until_ttl_expires() {
	let harness = Harness::new();

	harness.index.set_hits(vec![item_hit(1, "Python desde cero", "principiante")]);

	let first = harness.service.retrieve("¿Qué cursos de Python tienen?").await.expect("first");
	let second = harness.service.retrieve("  ¿qué cursos de python TIENEN? ").await.expect("second");

	assert_eq!(first, second);
	assert_eq!(harness.embedding.count(), 1);
	assert_eq!(harness.index.search_count(), 1);

	tokio::time::advance(Duration::from_secs(601)).await;

	harness.service.retrieve("¿Qué cursos de Python tienen?").await.expect("third");

	assert_eq!(harness.embedding.count(), 2);
	assert_eq!(harness.index.search_count(), 2);
}

#[tokio::test]
async fn failed_lookups_are_not_cached() {
	let harness = Harness::new();

	harness.embedding.fail_next.store(true, Ordering::SeqCst);

	assert!(matches!(
		harness.service.retrieve("cursos de diseño").await,
		Err(Error::Provider { .. })
	));
	assert!(harness.service.cache.is_empty());

	harness.index.set_hits(vec![category_hit(1_000_004, "Diseño")]);

	let reconciliation = harness.service.retrieve("cursos de diseño").await.expect("retry");

	assert_eq!(reconciliation.kind(), Some(RecordKind::Category));
	assert_eq!(harness.embedding.count(), 2);
	assert_eq!(harness.index.search_count(), 1);
}

#[tokio::test]
async fn empty_result_is_a_cached_sentinel() {
	let harness = Harness::new();
	let first = harness.service.retrieve("cursos de cocina").await.expect("first");

	harness.service.retrieve("cursos de cocina").await.expect("second");

	assert_eq!(first, Reconciliation::NoResults);
	assert_eq!(first.context_text(), NO_RESULTS);
	assert_eq!(harness.index.search_count(), 1);
}

#[tokio::test]
async fn promotion_and_general_paths_use_separate_entries() {
	let harness = Harness::new();

	harness.service.retrieve("ofertas").await.expect("general");
	harness.service.retrieve_promotions("ofertas").await.expect("promotions");

	assert_eq!(harness.index.search_count(), 2);
	assert_eq!(harness.service.cache.len(), 2);
}

#[tokio::test]
async fn blank_promotion_question_embeds_the_fallback_query() {
	let harness = Harness::new();

	harness.service.retrieve_promotions("   ").await.expect("promotions");

	let texts = harness.embedding.texts.lock().expect("texts lock").clone();

	assert_eq!(texts, vec![FALLBACK_QUERY.to_string()]);
}
