use clap::Parser;

use medi_import::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = Args::parse();

	medi_import::run(args).await
}
