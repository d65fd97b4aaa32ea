use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct ItemRow {
	pub item_id: i64,
	pub title: String,
	pub description: Option<String>,
	pub level: Option<String>,
	pub language: Option<String>,
	pub price: f64,
	pub capacity: i32,
	pub category_id: Option<i64>,
	pub category_name: Option<String>,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ItemPromotionRow {
	pub item_id: i64,
	pub name: String,
	pub discount_percent: f64,
	pub starts_on: Date,
	pub ends_on: Date,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CategoryRow {
	pub category_id: i64,
	pub name: String,
	pub description: Option<String>,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PromotionRow {
	pub promotion_id: i64,
	pub name: String,
	pub description: Option<String>,
	pub discount_percent: f64,
	pub starts_on: Date,
	pub ends_on: Date,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct PromotionItemRow {
	pub promotion_id: i64,
	pub title: String,
	pub price: f64,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ChatMessage {
	pub message_id: Uuid,
	pub user_id: String,
	pub chat_id: String,
	pub role: String,
	pub content: String,
	pub created_at: OffsetDateTime,
}
