//! Shared plumbing for the index build binaries.

use clap::Args;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Command line of both build binaries: one configuration file.
#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Configuration file (TOML or YAML); `DOCIDX_*` environment variables override it
    pub config: PathBuf,
}

/// Logs go to stderr so stdout carries only the summary line.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
