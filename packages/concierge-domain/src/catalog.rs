use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::Date;

use crate::{Error, Result};

/// Natural ids must stay below this bound so the per-kind offsets never overlap.
pub const ID_SPACE: u64 = 1_000_000;
pub const CATEGORY_ID_OFFSET: u64 = ID_SPACE;
pub const PROMOTION_ID_OFFSET: u64 = 2 * ID_SPACE;
pub const SEGMENT_SEPARATOR: &str = " | ";

/// Payload keys shared by the synchronizer, the index filters, and the reconciler.
pub mod keys {
	pub const KIND: &str = "kind";
	pub const RECORD_ID: &str = "record_id";
	pub const SEARCHABLE_TEXT: &str = "searchable_text";

	pub const TITLE: &str = "title";
	pub const DESCRIPTION: &str = "description";
	pub const LEVEL: &str = "level";
	pub const LANGUAGE: &str = "language";
	pub const PRICE: &str = "price";
	pub const CAPACITY: &str = "capacity";
	pub const AVAILABLE: &str = "available";
	pub const CATEGORY_ID: &str = "category_id";
	pub const CATEGORY_NAME: &str = "category_name";
	pub const ACTIVE_PROMOTIONS: &str = "active_promotions";

	pub const NAME: &str = "name";

	pub const DISCOUNT_PERCENT: &str = "discount_percent";
	pub const STARTS_ON: &str = "starts_on";
	pub const ENDS_ON: &str = "ends_on";
	pub const ACTIVE: &str = "active";
	pub const ITEM_NAMES: &str = "item_names";
	pub const ITEM_DETAILS: &str = "item_details";
	pub const ITEM_COUNT: &str = "item_count";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
	Item,
	Category,
	Promotion,
}
impl RecordKind {
	pub const ALL: [Self; 3] = [Self::Item, Self::Category, Self::Promotion];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Item => "item",
			Self::Category => "category",
			Self::Promotion => "promotion",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"item" => Some(Self::Item),
			"category" => Some(Self::Category),
			"promotion" => Some(Self::Promotion),
			_ => None,
		}
	}

	pub fn id_offset(self) -> u64 {
		match self {
			Self::Item => 0,
			Self::Category => CATEGORY_ID_OFFSET,
			Self::Promotion => PROMOTION_ID_OFFSET,
		}
	}

	pub fn point_id(self, record_id: i64) -> Result<u64> {
		let raw = u64::try_from(record_id)
			.ok()
			.filter(|id| *id < ID_SPACE)
			.ok_or(Error::IdOutOfRange { kind: self.as_str(), record_id })?;

		Ok(raw + self.id_offset())
	}

	pub fn from_point_id(point_id: u64) -> Option<(Self, u64)> {
		let kind = match point_id / ID_SPACE {
			0 => Self::Item,
			1 => Self::Category,
			2 => Self::Promotion,
			_ => return None,
		};

		Some((kind, point_id - kind.id_offset()))
	}
}
impl fmt::Display for RecordKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A promotion as seen from one of its items.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkedPromotion {
	pub name: String,
	pub discount_percent: f64,
	pub starts_on: Date,
	pub ends_on: Date,
}
impl LinkedPromotion {
	pub fn is_active(&self, today: Date) -> bool {
		window_contains(self.starts_on, self.ends_on, today)
	}
}

/// An item as seen from one of its promotions.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkedItem {
	pub title: String,
	pub price: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemRecord {
	pub id: i64,
	pub title: String,
	pub description: Option<String>,
	pub level: Option<String>,
	pub language: Option<String>,
	pub price: f64,
	pub capacity: i64,
	pub category_id: Option<i64>,
	pub category_name: Option<String>,
	pub promotions: Vec<LinkedPromotion>,
}
impl ItemRecord {
	pub fn available(&self) -> bool {
		self.capacity > 0
	}

	/// "name (N% off)" for each promotion running today, or `None` when none are.
	pub fn active_promotions_summary(&self, today: Date) -> Option<String> {
		let parts = self
			.promotions
			.iter()
			.filter(|promotion| promotion.is_active(today))
			.map(|promotion| format!("{} ({}% off)", promotion.name.trim(), promotion.discount_percent))
			.collect::<Vec<_>>();

		if parts.is_empty() { None } else { Some(parts.join(SEGMENT_SEPARATOR)) }
	}

	fn segments(&self, today: Date) -> Vec<String> {
		let mut segments = Vec::new();

		push_segment(&mut segments, Some(self.title.as_str()), None);
		push_segment(&mut segments, self.description.as_deref(), None);
		push_segment(&mut segments, self.level.as_deref(), Some("Level"));
		push_segment(&mut segments, self.language.as_deref(), Some("Language"));
		segments.push(format!("Price: ${:.2}", self.price));
		push_segment(&mut segments, self.category_name.as_deref(), Some("Category"));
		segments.push(if self.available() { "Available".to_string() } else { "Sold out".to_string() });
		push_segment(
			&mut segments,
			self.active_promotions_summary(today).as_deref(),
			Some("Promotions"),
		);

		segments
	}

	fn payload(&self, today: Date) -> Map<String, Value> {
		let mut payload = Map::new();

		payload.insert(keys::TITLE.to_string(), Value::from(self.title.clone()));
		payload.insert(keys::DESCRIPTION.to_string(), optional_text(&self.description));
		payload.insert(keys::LEVEL.to_string(), optional_text(&self.level));
		payload.insert(keys::LANGUAGE.to_string(), optional_text(&self.language));
		payload.insert(keys::PRICE.to_string(), Value::from(self.price));
		payload.insert(keys::CAPACITY.to_string(), Value::from(self.capacity));
		payload.insert(keys::AVAILABLE.to_string(), Value::from(self.available()));
		payload.insert(
			keys::CATEGORY_ID.to_string(),
			self.category_id.map(Value::from).unwrap_or(Value::Null),
		);
		payload.insert(keys::CATEGORY_NAME.to_string(), optional_text(&self.category_name));
		payload.insert(
			keys::ACTIVE_PROMOTIONS.to_string(),
			self.active_promotions_summary(today).map(Value::from).unwrap_or(Value::Null),
		);

		payload
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryRecord {
	pub id: i64,
	pub name: String,
	pub description: Option<String>,
}
impl CategoryRecord {
	fn segments(&self) -> Vec<String> {
		let mut segments = Vec::new();

		push_segment(&mut segments, Some(self.name.as_str()), None);
		push_segment(&mut segments, self.description.as_deref(), None);

		segments
	}

	fn payload(&self) -> Map<String, Value> {
		let mut payload = Map::new();

		payload.insert(keys::NAME.to_string(), Value::from(self.name.clone()));
		payload.insert(keys::DESCRIPTION.to_string(), optional_text(&self.description));

		payload
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct PromotionRecord {
	pub id: i64,
	pub name: String,
	pub description: Option<String>,
	pub discount_percent: f64,
	pub starts_on: Date,
	pub ends_on: Date,
	pub items: Vec<LinkedItem>,
}
impl PromotionRecord {
	pub fn is_active(&self, today: Date) -> bool {
		window_contains(self.starts_on, self.ends_on, today)
	}

	pub fn item_names(&self) -> Vec<String> {
		self.items.iter().map(|item| item.title.clone()).collect()
	}

	pub fn item_details(&self) -> Vec<String> {
		self.items.iter().map(|item| format!("{} (${:.2})", item.title, item.price)).collect()
	}

	fn segments(&self) -> Vec<String> {
		let mut segments = Vec::new();

		push_segment(&mut segments, Some(self.name.as_str()), None);
		push_segment(&mut segments, self.description.as_deref(), None);
		segments.push(format!("Discount: {}%", self.discount_percent));
		segments.push(format!("Valid: {} to {}", self.starts_on, self.ends_on));

		if !self.items.is_empty() {
			segments.push(format!("Items: {}", self.item_names().join(", ")));
		}

		segments
	}

	fn payload(&self, today: Date) -> Map<String, Value> {
		let mut payload = Map::new();

		payload.insert(keys::NAME.to_string(), Value::from(self.name.clone()));
		payload.insert(keys::DESCRIPTION.to_string(), optional_text(&self.description));
		payload.insert(keys::DISCOUNT_PERCENT.to_string(), Value::from(self.discount_percent));
		payload.insert(keys::STARTS_ON.to_string(), Value::from(self.starts_on.to_string()));
		payload.insert(keys::ENDS_ON.to_string(), Value::from(self.ends_on.to_string()));
		payload.insert(keys::ACTIVE.to_string(), Value::from(self.is_active(today)));
		payload.insert(keys::ITEM_NAMES.to_string(), Value::from(self.item_names()));
		payload.insert(keys::ITEM_DETAILS.to_string(), Value::from(self.item_details()));
		payload.insert(keys::ITEM_COUNT.to_string(), Value::from(self.items.len() as u64));

		payload
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum CatalogRecord {
	Item(ItemRecord),
	Category(CategoryRecord),
	Promotion(PromotionRecord),
}
impl CatalogRecord {
	pub fn kind(&self) -> RecordKind {
		match self {
			Self::Item(_) => RecordKind::Item,
			Self::Category(_) => RecordKind::Category,
			Self::Promotion(_) => RecordKind::Promotion,
		}
	}

	pub fn record_id(&self) -> i64 {
		match self {
			Self::Item(item) => item.id,
			Self::Category(category) => category.id,
			Self::Promotion(promotion) => promotion.id,
		}
	}

	pub fn point_id(&self) -> Result<u64> {
		self.kind().point_id(self.record_id())
	}

	/// Deterministic text the embedding is computed from. Missing optional fields are omitted.
	pub fn searchable_text(&self, today: Date) -> String {
		let segments = match self {
			Self::Item(item) => item.segments(today),
			Self::Category(category) => category.segments(),
			Self::Promotion(promotion) => promotion.segments(),
		};

		segments.join(SEGMENT_SEPARATOR)
	}

	/// Builds the payload with `available` and `active` derived against `today`.
	pub fn payload(&self, today: Date) -> Map<String, Value> {
		let mut payload = match self {
			Self::Item(item) => item.payload(today),
			Self::Category(category) => category.payload(),
			Self::Promotion(promotion) => promotion.payload(today),
		};

		payload.insert(keys::KIND.to_string(), Value::from(self.kind().as_str()));
		payload.insert(keys::RECORD_ID.to_string(), Value::from(self.record_id()));
		payload.insert(keys::SEARCHABLE_TEXT.to_string(), Value::from(self.searchable_text(today)));

		payload
	}

	pub fn document(&self, today: Date) -> Result<IndexDocument> {
		let point_id = self.point_id()?;
		let searchable_text = self.searchable_text(today);

		if searchable_text.trim().is_empty() {
			return Err(Error::EmptySearchableText {
				kind: self.kind().as_str(),
				record_id: self.record_id(),
			});
		}

		Ok(IndexDocument {
			point_id,
			kind: self.kind(),
			record_id: self.record_id(),
			searchable_text,
			payload: self.payload(today),
		})
	}
}

/// Everything the synchronizer writes for one record.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexDocument {
	pub point_id: u64,
	pub kind: RecordKind,
	pub record_id: i64,
	pub searchable_text: String,
	pub payload: Map<String, Value>,
}

fn window_contains(starts_on: Date, ends_on: Date, today: Date) -> bool {
	starts_on <= today && today <= ends_on
}

fn push_segment(segments: &mut Vec<String>, value: Option<&str>, label: Option<&str>) {
	let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
		return;
	};

	match label {
		Some(label) => segments.push(format!("{label}: {value}")),
		None => segments.push(value.to_string()),
	}
}

fn optional_text(value: &Option<String>) -> Value {
	value
		.as_deref()
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(Value::from)
		.unwrap_or(Value::Null)
}
