use anyhow::Context;
use clap::Parser;
use docidx_cli::{init_tracing, BuildArgs};
use docidx_core::config::Config;
use docidx_vector::DenseBuilder;

/// Build the dense (flat inner-product) index and its ID map from precomputed embeddings.
#[derive(Parser)]
#[command(name = "docidx-dense-build", version)]
struct Cli {
    #[command(flatten)]
    args: BuildArgs,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load(&cli.args.config).with_context(|| format!("loading config {}", cli.args.config.display()))?;
    let settings = config.dense()?;
    let builder = DenseBuilder::new(settings);
    let report = tokio::runtime::Runtime::new()?.block_on(async { builder.build().await })?;
    println!("{}", report);
    Ok(())
}
