use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = medi_api::Args::parse();

	medi_api::run(args).await
}
