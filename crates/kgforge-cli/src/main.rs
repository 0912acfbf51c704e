//! kgforge CLI - Build knowledge graphs from document corpora.

use anyhow::Context;
use clap::Parser;
use kgforge_builder::BuildConfig;
use kgforge_cli::{commands, logging, Cli, Command};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    let config = match &cli.config {
        Some(path) => BuildConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => BuildConfig::from(cli.preset),
    };

    match cli.command {
        Command::Build(args) => {
            let dataset = args.dataset.clone();
            commands::execute_build(args, config)
                .with_context(|| format!("build of dataset '{}' failed", dataset))?;
        }
        Command::Chunk(args) => commands::execute_chunk(args, config)?,
        Command::Schema(args) => commands::execute_schema(args, &config)?,
        Command::Config => {
            let toml = config.to_toml().map_err(anyhow::Error::msg)?;
            print!("{}", toml);
        }
    }

    Ok(())
}
