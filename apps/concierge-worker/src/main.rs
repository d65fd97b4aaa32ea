use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = concierge_worker::Args::parse();

	concierge_worker::run(args).await
}
