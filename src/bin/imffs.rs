//! IMFFS shell
//!
//! Interactive command shell over an in-memory flat file system

use anyhow::Context;
use clap::Parser;
use imffs::shell::Shell;
use imffs::{ImffsBuilder, StoreConfig};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "imffs")]
#[command(about = "In-memory flat file system shell")]
struct Args {
    /// Number of 256-byte blocks in the arena (overrides the config file)
    #[arg(short = 'b', long)]
    blocks: Option<usize>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print listings and reports as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never mix with command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => StoreConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::default(),
    };

    let mut builder = ImffsBuilder::from_config(config);
    if let Some(blocks) = args.blocks {
        builder = builder.block_count(blocks);
    }

    let store = builder.build().context("creating store")?;
    info!("Store ready with {} blocks", store.block_count());

    let stdin = io::stdin();
    let interactive = stdin.is_terminal();

    let mut shell = Shell::new(store, io::stdout().lock())
        .with_json(args.json)
        .with_prompt(interactive);
    shell.run(stdin.lock()).context("reading commands")?;

    Ok(())
}
