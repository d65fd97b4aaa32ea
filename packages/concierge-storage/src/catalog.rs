//! Reads of the relational catalog. With `since` set, only rows whose indexed representation may
//! have changed are returned, including rows whose derived state flipped because a promotion
//! window opened or closed.

use std::collections::HashMap;

use sqlx::{PgExecutor, PgPool};
use time::{Date, OffsetDateTime};

use concierge_domain::catalog::{
	CategoryRecord, ItemRecord, LinkedItem, LinkedPromotion, PromotionRecord,
};

use crate::{
	Result,
	models::{CategoryRow, ItemPromotionRow, ItemRow, PromotionItemRow, PromotionRow},
};

pub async fn fetch_item_rows<'e, E>(
	executor: E,
	since: Option<OffsetDateTime>,
	today: Date,
) -> Result<Vec<ItemRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ItemRow>(
		"\
SELECT
	i.item_id,
	i.title,
	i.description,
	i.level,
	i.language,
	i.price::float8 AS price,
	i.capacity,
	i.category_id,
	c.name AS category_name,
	i.updated_at
FROM items i
LEFT JOIN categories c ON c.category_id = i.category_id
WHERE $1::timestamptz IS NULL
	OR i.updated_at >= $1
	OR c.updated_at >= $1
	OR EXISTS (
		SELECT 1
		FROM promotion_items pi
		JOIN promotions p ON p.promotion_id = pi.promotion_id
		WHERE pi.item_id = i.item_id
			AND (
				pi.created_at >= $1
				OR p.updated_at >= $1
				OR p.starts_on BETWEEN ($1::timestamptz)::date AND $2::date
				OR p.ends_on + 1 BETWEEN ($1::timestamptz)::date AND $2::date
			)
	)
ORDER BY i.item_id",
	)
	.bind(since)
	.bind(today)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn fetch_item_promotion_rows<'e, E>(
	executor: E,
	item_ids: &[i64],
) -> Result<Vec<ItemPromotionRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, ItemPromotionRow>(
		"\
SELECT
	pi.item_id,
	p.name,
	p.discount_percent::float8 AS discount_percent,
	p.starts_on,
	p.ends_on
FROM promotion_items pi
JOIN promotions p ON p.promotion_id = pi.promotion_id
WHERE pi.item_id = ANY($1)
ORDER BY pi.item_id, p.promotion_id",
	)
	.bind(item_ids)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn fetch_category_rows<'e, E>(
	executor: E,
	since: Option<OffsetDateTime>,
) -> Result<Vec<CategoryRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, CategoryRow>(
		"\
SELECT category_id, name, description, updated_at
FROM categories
WHERE $1::timestamptz IS NULL OR updated_at >= $1
ORDER BY category_id",
	)
	.bind(since)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn fetch_promotion_rows<'e, E>(
	executor: E,
	since: Option<OffsetDateTime>,
	today: Date,
) -> Result<Vec<PromotionRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, PromotionRow>(
		"\
SELECT
	p.promotion_id,
	p.name,
	p.description,
	p.discount_percent::float8 AS discount_percent,
	p.starts_on,
	p.ends_on,
	p.updated_at
FROM promotions p
WHERE $1::timestamptz IS NULL
	OR p.updated_at >= $1
	OR p.starts_on BETWEEN ($1::timestamptz)::date AND $2::date
	OR p.ends_on + 1 BETWEEN ($1::timestamptz)::date AND $2::date
	OR EXISTS (
		SELECT 1
		FROM promotion_items pi
		JOIN items i ON i.item_id = pi.item_id
		WHERE pi.promotion_id = p.promotion_id
			AND (pi.created_at >= $1 OR i.updated_at >= $1)
	)
ORDER BY p.promotion_id",
	)
	.bind(since)
	.bind(today)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn fetch_promotion_item_rows<'e, E>(
	executor: E,
	promotion_ids: &[i64],
) -> Result<Vec<PromotionItemRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, PromotionItemRow>(
		"\
SELECT pi.promotion_id, i.title, i.price::float8 AS price
FROM promotion_items pi
JOIN items i ON i.item_id = pi.item_id
WHERE pi.promotion_id = ANY($1)
ORDER BY pi.promotion_id, i.item_id",
	)
	.bind(promotion_ids)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn load_items(
	pool: &PgPool,
	since: Option<OffsetDateTime>,
	today: Date,
) -> Result<Vec<ItemRecord>> {
	let rows = fetch_item_rows(pool, since, today).await?;
	let ids = rows.iter().map(|row| row.item_id).collect::<Vec<_>>();
	let mut promotions: HashMap<i64, Vec<LinkedPromotion>> = HashMap::new();

	if !ids.is_empty() {
		for link in fetch_item_promotion_rows(pool, &ids).await? {
			promotions.entry(link.item_id).or_default().push(LinkedPromotion {
				name: link.name,
				discount_percent: link.discount_percent,
				starts_on: link.starts_on,
				ends_on: link.ends_on,
			});
		}
	}

	Ok(rows
		.into_iter()
		.map(|row| ItemRecord {
			promotions: promotions.remove(&row.item_id).unwrap_or_default(),
			id: row.item_id,
			title: row.title,
			description: row.description,
			level: row.level,
			language: row.language,
			price: row.price,
			capacity: i64::from(row.capacity),
			category_id: row.category_id,
			category_name: row.category_name,
		})
		.collect())
}

pub async fn load_categories(
	pool: &PgPool,
	since: Option<OffsetDateTime>,
) -> Result<Vec<CategoryRecord>> {
	let rows = fetch_category_rows(pool, since).await?;

	Ok(rows
		.into_iter()
		.map(|row| CategoryRecord {
			id: row.category_id,
			name: row.name,
			description: row.description,
		})
		.collect())
}

pub async fn load_promotions(
	pool: &PgPool,
	since: Option<OffsetDateTime>,
	today: Date,
) -> Result<Vec<PromotionRecord>> {
	let rows = fetch_promotion_rows(pool, since, today).await?;
	let ids = rows.iter().map(|row| row.promotion_id).collect::<Vec<_>>();
	let mut items: HashMap<i64, Vec<LinkedItem>> = HashMap::new();

	if !ids.is_empty() {
		for link in fetch_promotion_item_rows(pool, &ids).await? {
			items
				.entry(link.promotion_id)
				.or_default()
				.push(LinkedItem { title: link.title, price: link.price });
		}
	}

	Ok(rows
		.into_iter()
		.map(|row| PromotionRecord {
			items: items.remove(&row.promotion_id).unwrap_or_default(),
			id: row.promotion_id,
			name: row.name,
			description: row.description,
			discount_percent: row.discount_percent,
			starts_on: row.starts_on,
			ends_on: row.ends_on,
		})
		.collect())
}
