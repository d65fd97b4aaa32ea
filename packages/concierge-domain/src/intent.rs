use serde::{Deserialize, Serialize};

use crate::text;

const PROMOTION_KEYWORDS: &[&str] = &[
	"promocion", "promo", "descuento", "oferta", "rebaja", "cupon", "discount", "promotion", "offer",
	"deal", "coupon",
];
const PRICE_KEYWORDS: &[&str] = &["precio", "cuesta", "cuanto", "costo", "price", "cost", "how much"];
const LEVEL_KEYWORDS: &[&str] = &["nivel", "level", "dificultad", "difficulty"];
const LANGUAGE_KEYWORDS: &[&str] = &["idioma", "lengua", "language"];
const CAPACITY_KEYWORDS: &[&str] = &["cupo", "capacidad", "plaza", "capacity", "seat", "spot"];
const AVAILABILITY_KEYWORDS: &[&str] = &["disponib", "available", "availability", "agotado"];

/// Which detail of the remembered item a follow-up asks about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailField {
	Price,
	Level,
	Language,
	Capacity,
	Availability,
}
impl DetailField {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Price => "price",
			Self::Level => "level",
			Self::Language => "language",
			Self::Capacity => "capacity",
			Self::Availability => "availability",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
	Promotions,
	FollowUp(DetailField),
	General,
}

/// Keyword dispatch. Promotions win over follow-ups, and a follow-up needs a remembered item and a
/// short message.
pub fn classify(message: &str, has_last_item: bool, follow_up_max_words: usize) -> Intent {
	if text::mentions_any(message, PROMOTION_KEYWORDS) {
		return Intent::Promotions;
	}
	if has_last_item
		&& text::word_count(message) <= follow_up_max_words
		&& let Some(field) = detail_field(message)
	{
		return Intent::FollowUp(field);
	}

	Intent::General
}

pub fn detail_field(message: &str) -> Option<DetailField> {
	[
		(DetailField::Price, PRICE_KEYWORDS),
		(DetailField::Level, LEVEL_KEYWORDS),
		(DetailField::Language, LANGUAGE_KEYWORDS),
		(DetailField::Capacity, CAPACITY_KEYWORDS),
		(DetailField::Availability, AVAILABILITY_KEYWORDS),
	]
	.into_iter()
	.find(|(_, keywords)| text::mentions_any(message, keywords))
	.map(|(field, _)| field)
}
