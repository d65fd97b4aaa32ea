//! Disposable backends for integration tests.
//!
//! Tests opt in through `CONCIERGE_PG_DSN` and `CONCIERGE_QDRANT_URL`; without them they skip.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, sync::Mutex, thread, time::Duration};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::{runtime::Builder, time};
use uuid::Uuid;

const MAINTENANCE_DATABASES: [&str; 2] = ["postgres", "template1"];
const QDRANT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// A fresh Postgres database cloned from the configured server, plus any Qdrant collections the
/// test asked to name through it. Both are dropped on [`TestDatabase::cleanup`] or on drop.
pub struct TestDatabase {
	name: String,
	dsn: String,
	maintenance: PgConnectOptions,
	collections: Mutex<Vec<String>>,
	cleaned: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn).map_err(|err| {
			Error::Message(format!("CONCIERGE_PG_DSN is not a valid DSN: {err}."))
		})?;
		let (maintenance, mut conn) = connect_maintenance(&base).await?;
		let name = format!("concierge_test_{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, maintenance, collections: Mutex::new(Vec::new()), cleaned: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// A collection name scoped to this database. It is deleted together with the database.
	pub fn collection_name(&self, prefix: &str) -> String {
		let collection = format!("{prefix}_{}", self.name);

		self.collections.lock().unwrap_or_else(|err| err.into_inner()).push(collection.clone());

		collection
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleaned = true;

		let collections = self.take_collections();
		let qdrant = drop_collections(&collections).await;

		drop_database(&self.name, &self.maintenance).await?;

		qdrant
	}

	fn take_collections(&self) -> Vec<String> {
		std::mem::take(&mut *self.collections.lock().unwrap_or_else(|err| err.into_inner()))
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let maintenance = self.maintenance.clone();
		let collections = self.take_collections();
		// Drop cannot await; a panicking test still gets its database removed.
		let handle = thread::spawn(move || {
			let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
				eprintln!("Leaking test database {name}; no runtime for cleanup.");

				return;
			};

			runtime.block_on(async {
				if let Err(err) = drop_collections(&collections).await {
					eprintln!("{err}");
				}
				if let Err(err) = drop_database(&name, &maintenance).await {
					eprintln!("Failed to drop test database {name}: {err}.");
				}
			});
		});
		let _ = handle.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var("CONCIERGE_PG_DSN").ok().filter(|dsn| !dsn.trim().is_empty())
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("CONCIERGE_QDRANT_URL").ok().filter(|url| !url.trim().is_empty())
}

async fn connect_maintenance(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut failures = Vec::new();

	for database in MAINTENANCE_DATABASES {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => failures.push(format!("{database}: {err}")),
		}
	}

	Err(Error::Message(format!(
		"No maintenance database accepted the connection ({}).",
		failures.join("; ")
	)))
}

async fn drop_database(name: &str, maintenance: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(maintenance).await?;

	// Pool connections from the test may still be open. Terminating them is best effort.
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.execute(&mut conn)
	.await;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str()).await?;

	Ok(())
}

async fn drop_collections(collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let Some(url) = env_qdrant_url() else {
		return Ok(());
	};
	let client = Qdrant::from_url(&url).build().map_err(|err| Error::QdrantCleanup {
		collection: collections.join(", "),
		message: err.to_string(),
	})?;

	for collection in collections {
		let cleanup_failed = |message: String| Error::QdrantCleanup {
			collection: collection.clone(),
			message,
		};
		let exists =
			time::timeout(QDRANT_CALL_TIMEOUT, client.collection_exists(collection.clone()))
				.await
				.map_err(|_| cleanup_failed("existence check timed out".to_string()))?
				.map_err(|err| cleanup_failed(err.to_string()))?;

		if !exists {
			continue;
		}

		time::timeout(QDRANT_CALL_TIMEOUT, client.delete_collection(collection.clone()))
			.await
			.map_err(|_| cleanup_failed("delete timed out".to_string()))?
			.map_err(|err| cleanup_failed(err.to_string()))?;
	}

	Ok(())
}
