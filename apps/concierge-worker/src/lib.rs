pub mod worker;

mod error;

pub use error::{Error, Result};

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use concierge_service::ConciergeService;
use concierge_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = concierge_cli::VERSION,
	rename_all = "kebab",
	styles = concierge_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Run a single sync pass and exit.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = concierge_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let pool = db.pool.clone();
	let qdrant = QdrantStore::new(&config.storage.qdrant)?;
	let interval = Duration::from_secs(config.sync.interval_seconds.max(1));
	let service = ConciergeService::new(config, db, qdrant);
	let state = worker::WorkerState { service, pool, interval };

	if args.once {
		worker::sync_once(&state).await?;

		return Ok(());
	}

	worker::run_worker(state).await
}
