//! Periodic catalog synchronization driven by a cursor stored in Postgres.

use std::time::Duration;

use sqlx::PgPool;
use time::OffsetDateTime;

use concierge_service::{ConciergeService, SyncReport};
use concierge_storage::sync_state::{self, CATALOG_CURSOR};

use crate::Result;

pub struct WorkerState {
	pub service: ConciergeService,
	pub pool: PgPool,
	pub interval: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPlan {
	Full,
	Incremental { since: OffsetDateTime },
}
impl SyncPlan {
	/// A missing cursor means the index was never built from this database.
	pub fn from_cursor(cursor: Option<OffsetDateTime>) -> Self {
		match cursor {
			Some(since) => Self::Incremental { since },
			None => Self::Full,
		}
	}
}

pub async fn run_worker(state: WorkerState) -> color_eyre::Result<()> {
	let mut ticker = tokio::time::interval(state.interval);

	ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;

		if let Err(err) = sync_once(&state).await {
			tracing::error!(error = %err, "Catalog sync failed.");
		}
	}
}

/// Runs one pass and advances the cursor to the moment the pass started.
pub async fn sync_once(state: &WorkerState) -> Result<SyncReport> {
	let cursor = sync_state::get_cursor(&state.pool, CATALOG_CURSOR).await?;
	let plan = SyncPlan::from_cursor(cursor);
	let run_at = OffsetDateTime::now_utc();
	let report = match plan {
		SyncPlan::Full => state.service.sync_all().await?,
		SyncPlan::Incremental { since } => state.service.sync_incremental(since).await?,
	};

	sync_state::set_cursor(&state.pool, CATALOG_CURSOR, run_at).await?;

	tracing::info!(
		?plan,
		synced = report.synced_count,
		failed = report.failed_count,
		"Worker sync pass completed."
	);

	Ok(report)
}
