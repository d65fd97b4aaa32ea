use std::collections::HashMap;

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		Condition, CreateCollectionBuilder, CreateFieldIndexCollection, Distance, FieldType, Filter,
		PointStruct, Query, QueryPointsBuilder, ScoredPoint, UpsertPointsBuilder, Value,
		VectorParamsBuilder, point_id::PointIdOptions, value::Kind,
	},
};
use serde_json::Map;

use concierge_domain::{
	catalog::keys,
	index::{CollectionInfo, FieldMatch, Hit, MatchValue, SearchFilter},
};

use crate::{Error, Result};

/// Payload fields the retrieval path filters on.
pub const PAYLOAD_INDEXES: [(&str, FieldType); 5] = [
	(keys::KIND, FieldType::Keyword),
	(keys::ACTIVE, FieldType::Bool),
	(keys::AVAILABLE, FieldType::Bool),
	(keys::CATEGORY_ID, FieldType::Integer),
	(keys::PRICE, FieldType::Float),
];

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &concierge_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).api_key(cfg.api_key.clone()).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the cosine collection and its payload indexes. Safe to call repeatedly.
	pub async fn ensure_collection(&self) -> Result<()> {
		if !self.client.collection_exists(self.collection.clone()).await? {
			let builder = CreateCollectionBuilder::new(self.collection.clone())
				.vectors_config(VectorParamsBuilder::new(self.vector_dim as u64, Distance::Cosine));

			if let Err(err) = self.client.create_collection(builder).await {
				// Another process may have created it first.
				if !self.client.collection_exists(self.collection.clone()).await? {
					return Err(err.into());
				}
			}
		}

		for (field_name, field_type) in PAYLOAD_INDEXES {
			let request = CreateFieldIndexCollection {
				collection_name: self.collection.clone(),
				wait: Some(true),
				field_name: field_name.to_string(),
				field_type: Some(field_type as i32),
				field_index_params: None,
				ordering: None,
			};

			self.client.create_field_index(request).await?;
		}

		Ok(())
	}

	/// Overwrites the point with the same id, so repeated syncs never duplicate records.
	pub async fn upsert_point(
		&self,
		point_id: u64,
		vector: Vec<f32>,
		payload: Map<String, serde_json::Value>,
	) -> Result<()> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Vector has {} dimensions, expected {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let mut point_payload = Payload::new();

		for (key, value) in payload {
			point_payload.insert(key, value);
		}

		let point = PointStruct::new(point_id, vector, point_payload);

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true))
			.await?;

		Ok(())
	}

	/// Nearest-neighbour search. A missing collection yields no hits; transport failures are
	/// returned as errors.
	pub async fn search(
		&self,
		vector: Vec<f32>,
		limit: u64,
		filter: &SearchFilter,
	) -> Result<Vec<Hit>> {
		let mut request = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.limit(limit)
			.with_payload(true);

		if let Some(filter) = build_filter(filter) {
			request = request.filter(filter);
		}

		match self.client.query(request).await {
			Ok(response) => Ok(response.result.into_iter().filter_map(scored_to_hit).collect()),
			Err(err) => match self.client.collection_exists(self.collection.clone()).await {
				Ok(false) => Ok(Vec::new()),
				_ => Err(err.into()),
			},
		}
	}

	pub async fn collection_info(&self) -> Result<CollectionInfo> {
		if !self.client.collection_exists(self.collection.clone()).await? {
			return Ok(CollectionInfo {
				collection: self.collection.clone(),
				exists: false,
				points_count: 0,
			});
		}

		let info = self.client.collection_info(self.collection.clone()).await?;

		Ok(CollectionInfo {
			collection: self.collection.clone(),
			exists: true,
			points_count: info.result.and_then(|result| result.points_count).unwrap_or(0),
		})
	}
}

/// Conjunction over fields; values listed for one field are alternatives.
pub fn build_filter(filter: &SearchFilter) -> Option<Filter> {
	if filter.is_empty() {
		return None;
	}

	Some(Filter::must(filter.must.iter().map(field_condition).collect::<Vec<_>>()))
}

fn field_condition(field: &FieldMatch) -> Condition {
	let mut alternatives = field
		.any_of
		.iter()
		.map(|value| match value {
			MatchValue::Keyword(keyword) => Condition::matches(field.key.clone(), keyword.clone()),
			MatchValue::Bool(flag) => Condition::matches(field.key.clone(), *flag),
			MatchValue::Integer(number) => Condition::matches(field.key.clone(), *number),
		})
		.collect::<Vec<_>>();

	if alternatives.len() == 1 {
		alternatives.remove(0)
	} else {
		Condition::from(Filter::should(alternatives))
	}
}

fn scored_to_hit(point: ScoredPoint) -> Option<Hit> {
	let point_id = match point.id.and_then(|id| id.point_id_options) {
		Some(PointIdOptions::Num(id)) => id,
		_ => return None,
	};

	Some(Hit { point_id, score: point.score, payload: payload_to_json(point.payload) })
}

pub fn payload_to_json(payload: HashMap<String, Value>) -> Map<String, serde_json::Value> {
	payload.into_iter().map(|(key, value)| (key, value_to_json(value))).collect()
}

fn value_to_json(value: Value) -> serde_json::Value {
	match value.kind {
		None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
		Some(Kind::BoolValue(flag)) => serde_json::Value::Bool(flag),
		Some(Kind::IntegerValue(number)) => serde_json::Value::from(number),
		Some(Kind::DoubleValue(number)) => serde_json::Value::from(number),
		Some(Kind::StringValue(text)) => serde_json::Value::String(text),
		Some(Kind::ListValue(list)) =>
			serde_json::Value::Array(list.values.into_iter().map(value_to_json).collect()),
		Some(Kind::StructValue(object)) => serde_json::Value::Object(
			object.fields.into_iter().map(|(key, value)| (key, value_to_json(value))).collect(),
		),
	}
}
