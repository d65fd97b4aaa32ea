use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = concierge_api::Args::parse();

	concierge_api::run(args).await
}
