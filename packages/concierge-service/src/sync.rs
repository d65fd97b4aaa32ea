//! Mirrors the relational catalog into the vector index.
//!
//! Every record is re-derived and upserted under its kind-offset point id, so repeated runs
//! overwrite instead of duplicating. A failure on one record is logged and counted; a failure to
//! read the catalog or reach the index aborts the run.

use serde::Serialize;
use time::{Date, Duration, OffsetDateTime};

use concierge_domain::{
	catalog::{CatalogRecord, RecordKind},
	index::CollectionInfo,
};

use crate::{ConciergeService, Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KindReport {
	pub kind: RecordKind,
	pub synced: u64,
	pub failed: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SyncReport {
	pub synced_count: u64,
	pub failed_count: u64,
	pub per_kind: Vec<KindReport>,
}
impl SyncReport {
	fn new() -> Self {
		Self {
			synced_count: 0,
			failed_count: 0,
			per_kind: RecordKind::ALL
				.iter()
				.map(|kind| KindReport { kind: *kind, synced: 0, failed: 0 })
				.collect(),
		}
	}

	pub fn kind(&self, kind: RecordKind) -> Option<&KindReport> {
		self.per_kind.iter().find(|report| report.kind == kind)
	}

	fn record(&mut self, kind: RecordKind, ok: bool) {
		if ok {
			self.synced_count += 1;
		} else {
			self.failed_count += 1;
		}

		if let Some(report) = self.per_kind.iter_mut().find(|report| report.kind == kind) {
			if ok {
				report.synced += 1;
			} else {
				report.failed += 1;
			}
		}
	}
}

impl ConciergeService {
	/// Creates the collection when missing, then re-syncs every record.
	pub async fn sync_all(&self) -> Result<SyncReport> {
		self.backends.index.ensure_collection().await?;

		self.sync_since(None).await
	}

	/// Re-syncs records changed at or after `since`. The caller owns persisting `since`.
	pub async fn sync_incremental(&self, since: OffsetDateTime) -> Result<SyncReport> {
		let info = self.backends.index.collection_info().await?;

		if !info.exists {
			return Err(Error::InvalidRequest {
				message: format!(
					"Collection {} does not exist. Run a full sync first.",
					info.collection
				),
			});
		}

		self.sync_since(Some(since)).await
	}

	pub async fn sync_status(&self) -> Result<CollectionInfo> {
		Ok(self.backends.index.collection_info().await?)
	}

	async fn sync_since(&self, since: Option<OffsetDateTime>) -> Result<SyncReport> {
		let today = OffsetDateTime::now_utc().date();
		let items = self.backends.catalog.fetch_items(since, today).await?;
		let categories = self.backends.catalog.fetch_categories(since).await?;
		let promotions = self.backends.catalog.fetch_promotions(since, today).await?;
		let records = items
			.into_iter()
			.map(CatalogRecord::Item)
			.chain(categories.into_iter().map(CatalogRecord::Category))
			.chain(promotions.into_iter().map(CatalogRecord::Promotion))
			.collect::<Vec<_>>();
		let mut report = SyncReport::new();

		tracing::info!(
			records = records.len(),
			incremental = since.is_some(),
			"Catalog sync started."
		);

		for record in &records {
			let outcome = self.sync_record(record, today).await;

			if let Err(err) = &outcome {
				tracing::warn!(
					kind = %record.kind(),
					record_id = record.record_id(),
					error = %err,
					"Failed to sync catalog record."
				);
			}

			report.record(record.kind(), outcome.is_ok());
		}

		tracing::info!(
			synced = report.synced_count,
			failed = report.failed_count,
			incremental = since.is_some(),
			"Catalog sync finished."
		);

		Ok(report)
	}

	async fn sync_record(&self, record: &CatalogRecord, today: Date) -> Result<()> {
		let document = record.document(today)?;
		let vector = self.embed_one(&document.searchable_text).await?;

		self.backends.index.upsert(document.point_id, vector, document.payload).await?;

		Ok(())
	}
}

/// `now` minus `hours`, saturating at the Unix epoch.
pub fn lookback_start(now: OffsetDateTime, hours: u64) -> OffsetDateTime {
	i64::try_from(hours)
		.ok()
		.and_then(|hours| hours.checked_mul(3_600))
		.and_then(|seconds| now.checked_sub(Duration::seconds(seconds)))
		.unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
