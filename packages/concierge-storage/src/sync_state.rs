use sqlx::PgExecutor;
use time::OffsetDateTime;

use crate::Result;

pub const CATALOG_CURSOR: &str = "catalog";

pub async fn get_cursor<'e, E>(executor: E, name: &str) -> Result<Option<OffsetDateTime>>
where
	E: PgExecutor<'e>,
{
	let cursor: Option<(OffsetDateTime,)> =
		sqlx::query_as("SELECT synced_through FROM sync_state WHERE name = $1")
			.bind(name)
			.fetch_optional(executor)
			.await?;

	Ok(cursor.map(|(at,)| at))
}

pub async fn set_cursor<'e, E>(executor: E, name: &str, synced_through: OffsetDateTime) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO sync_state (name, synced_through, updated_at)
VALUES ($1, $2, now())
ON CONFLICT (name) DO UPDATE
SET synced_through = EXCLUDED.synced_through, updated_at = now()",
	)
	.bind(name)
	.bind(synced_through)
	.execute(executor)
	.await?;

	Ok(())
}
