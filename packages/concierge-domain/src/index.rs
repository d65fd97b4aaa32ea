use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{RecordKind, keys};

/// One similarity-search result.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
	pub point_id: u64,
	pub score: f32,
	pub payload: Map<String, Value>,
}
impl Hit {
	/// `None` when the payload carries no recognizable kind tag.
	pub fn kind(&self) -> Option<RecordKind> {
		self.payload.get(keys::KIND).and_then(Value::as_str).and_then(RecordKind::parse)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum MatchValue {
	Keyword(String),
	Bool(bool),
	Integer(i64),
}
impl From<&str> for MatchValue {
	fn from(value: &str) -> Self {
		Self::Keyword(value.to_string())
	}
}
impl From<String> for MatchValue {
	fn from(value: String) -> Self {
		Self::Keyword(value)
	}
}
impl From<bool> for MatchValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<i64> for MatchValue {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}
impl From<RecordKind> for MatchValue {
	fn from(value: RecordKind) -> Self {
		Self::Keyword(value.as_str().to_string())
	}
}

/// A payload key that must equal one of `any_of`.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMatch {
	pub key: String,
	pub any_of: Vec<MatchValue>,
}

/// Conjunction of field matches. An empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchFilter {
	pub must: Vec<FieldMatch>,
}
impl SearchFilter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn exact(mut self, key: &str, value: impl Into<MatchValue>) -> Self {
		self.must.push(FieldMatch { key: key.to_string(), any_of: vec![value.into()] });

		self
	}

	pub fn any_of<V>(mut self, key: &str, values: impl IntoIterator<Item = V>) -> Self
	where
		V: Into<MatchValue>,
	{
		self.must.push(FieldMatch {
			key: key.to_string(),
			any_of: values.into_iter().map(Into::into).collect(),
		});

		self
	}

	pub fn is_empty(&self) -> bool {
		self.must.is_empty()
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
	pub collection: String,
	pub exists: bool,
	pub points_count: u64,
}
