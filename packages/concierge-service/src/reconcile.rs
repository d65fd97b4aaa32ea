//! Turns a heterogeneous hit list into one same-kind context.
//!
//! The predominant kind is the kind with the most hits. Ties go to the kind seen first in hit
//! order. Hits of other kinds are discarded, and hits without a recognizable kind are neither
//! rendered nor counted.

use serde_json::{Map, Value};

use concierge_domain::{
	catalog::{RecordKind, keys},
	index::Hit,
};

pub const NO_RESULTS: &str = "No matching catalog records were found.";
pub const BLOCK_SEPARATOR: &str = "\n---\n";

const NOT_AVAILABLE: &str = "N/A";

/// The single item a retrieval resolved to, kept so follow-ups can answer without a new lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedItem {
	pub point_id: u64,
	pub title: String,
	pub block: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reconciliation {
	Matches { kind: RecordKind, blocks: Vec<String>, single_item: Option<ResolvedItem> },
	NoResults,
}
impl Reconciliation {
	pub fn context_text(&self) -> String {
		match self {
			Self::Matches { blocks, .. } => blocks.join(BLOCK_SEPARATOR),
			Self::NoResults => NO_RESULTS.to_string(),
		}
	}

	pub fn kind(&self) -> Option<RecordKind> {
		match self {
			Self::Matches { kind, .. } => Some(*kind),
			Self::NoResults => None,
		}
	}

	pub fn single_item(&self) -> Option<&ResolvedItem> {
		match self {
			Self::Matches { single_item, .. } => single_item.as_ref(),
			Self::NoResults => None,
		}
	}
}

pub fn predominant_kind(hits: &[Hit]) -> Option<RecordKind> {
	let mut tally: Vec<(RecordKind, usize)> = Vec::new();

	for kind in hits.iter().filter_map(Hit::kind) {
		match tally.iter_mut().find(|(seen, _)| *seen == kind) {
			Some((_, count)) => *count += 1,
			None => tally.push((kind, 1)),
		}
	}

	let mut best: Option<(RecordKind, usize)> = None;

	for (kind, count) in tally {
		if best.map(|(_, best_count)| count > best_count).unwrap_or(true) {
			best = Some((kind, count));
		}
	}

	best.map(|(kind, _)| kind)
}

pub fn reconcile(hits: &[Hit]) -> Reconciliation {
	let Some(kind) = predominant_kind(hits) else {
		return Reconciliation::NoResults;
	};
	let retained = hits.iter().filter(|hit| hit.kind() == Some(kind)).collect::<Vec<_>>();

	if retained.is_empty() {
		return Reconciliation::NoResults;
	}

	let blocks = retained.iter().map(|hit| render_block(kind, &hit.payload)).collect::<Vec<_>>();
	let single_item = match (kind, retained.as_slice()) {
		(RecordKind::Item, [hit]) => Some(ResolvedItem {
			point_id: hit.point_id,
			title: text_field(&hit.payload, keys::TITLE),
			block: blocks[0].clone(),
		}),
		_ => None,
	};

	Reconciliation::Matches { kind, blocks, single_item }
}

pub fn render_block(kind: RecordKind, payload: &Map<String, Value>) -> String {
	match kind {
		RecordKind::Item => render_item(payload),
		RecordKind::Category => render_category(payload),
		RecordKind::Promotion => render_promotion(payload),
	}
}

fn render_item(payload: &Map<String, Value>) -> String {
	let mut lines = vec![
		format!("Title: {}", text_field(payload, keys::TITLE)),
		format!("Description: {}", text_field(payload, keys::DESCRIPTION)),
		format!("Level: {}", text_field(payload, keys::LEVEL)),
		format!("Language: {}", text_field(payload, keys::LANGUAGE)),
		format!("Price: {}", money_field(payload, keys::PRICE)),
		format!("Capacity: {}", number_field(payload, keys::CAPACITY)),
		format!("Available: {}", yes_no_field(payload, keys::AVAILABLE)),
	];

	if let Some(promotions) = optional_text(payload, keys::ACTIVE_PROMOTIONS) {
		lines.push(format!("Active promotions: {promotions}"));
	}

	lines.join("\n")
}

fn render_category(payload: &Map<String, Value>) -> String {
	[
		format!("Category: {}", text_field(payload, keys::NAME)),
		format!("Description: {}", text_field(payload, keys::DESCRIPTION)),
	]
	.join("\n")
}

fn render_promotion(payload: &Map<String, Value>) -> String {
	let mut lines = vec![
		format!("Promotion: {}", text_field(payload, keys::NAME)),
		format!("Description: {}", text_field(payload, keys::DESCRIPTION)),
		format!("Discount: {}%", number_field(payload, keys::DISCOUNT_PERCENT)),
	];

	if let (Some(starts_on), Some(ends_on)) =
		(optional_text(payload, keys::STARTS_ON), optional_text(payload, keys::ENDS_ON))
	{
		lines.push(format!("Valid: {starts_on} to {ends_on}"));
	}
	if let Some(details) = payload.get(keys::ITEM_DETAILS).and_then(Value::as_array) {
		let details = details.iter().filter_map(Value::as_str).collect::<Vec<_>>();

		if !details.is_empty() {
			lines.push(format!("Applies to: {}", details.join(", ")));
		}
	}

	lines.join("\n")
}

fn optional_text<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
	payload.get(key).and_then(Value::as_str).map(str::trim).filter(|text| !text.is_empty())
}

fn text_field(payload: &Map<String, Value>, key: &str) -> String {
	optional_text(payload, key).unwrap_or(NOT_AVAILABLE).to_string()
}

fn number_field(payload: &Map<String, Value>, key: &str) -> String {
	match payload.get(key) {
		Some(Value::Number(number)) => number.to_string(),
		_ => NOT_AVAILABLE.to_string(),
	}
}

fn money_field(payload: &Map<String, Value>, key: &str) -> String {
	payload
		.get(key)
		.and_then(Value::as_f64)
		.map(|amount| format!("${amount:.2}"))
		.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

// Rendered from the stored flag only.
fn yes_no_field(payload: &Map<String, Value>, key: &str) -> &'static str {
	match payload.get(key).and_then(Value::as_bool) {
		Some(true) => "Yes",
		Some(false) => "No",
		None => NOT_AVAILABLE,
	}
}
