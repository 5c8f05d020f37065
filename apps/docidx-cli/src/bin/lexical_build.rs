use anyhow::Context;
use clap::Parser;
use docidx_cli::{init_tracing, BuildArgs};
use docidx_core::config::Config;
use docidx_text::LexicalBuilder;

/// Build the lexical (tantivy) index from a JSON-lines corpus.
#[derive(Parser)]
#[command(name = "docidx-lexical-build", version)]
struct Cli {
    #[command(flatten)]
    args: BuildArgs,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load(&cli.args.config).with_context(|| format!("loading config {}", cli.args.config.display()))?;
    let settings = config.lexical()?;
    tracing::info!("Corpus: {}", settings.documents_path.display());
    let report = LexicalBuilder::new(settings).build()?;
    println!("{}", report);
    Ok(())
}
