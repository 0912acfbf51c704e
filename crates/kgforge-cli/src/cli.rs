//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand, ValueEnum};
use kgforge_builder::{BuildConfig, ConstructionMode};
use std::path::PathBuf;

/// kgforge - Build knowledge graphs from document corpora.
#[derive(Debug, Parser)]
#[command(name = "kgforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "KGFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Built-in configuration preset, used when no file is given
    #[arg(long, value_enum, global = true, default_value = "default")]
    pub preset: PresetArg,

    /// Log filter (e.g. `info`, `kgforge_builder=debug`); falls back to RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the knowledge graph of a dataset
    Build(BuildArgs),

    /// Chunk a corpus and write the chunk file, without extraction
    Chunk(ChunkArgs),

    /// Inspect dataset schemas
    Schema(SchemaArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    /// Balanced defaults
    Default,
    /// Large chunks, many workers, no communities
    Fast,
    /// Agent mode, small chunks, long deadlines
    Thorough,
}

impl From<PresetArg> for BuildConfig {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Default => BuildConfig::default(),
            PresetArg::Fast => BuildConfig::fast(),
            PresetArg::Thorough => BuildConfig::thorough(),
        }
    }
}

/// Construction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Schema evolves while extracting
    Agent,
    /// Fixed schema
    Noagent,
}

impl From<ModeArg> for ConstructionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Agent => ConstructionMode::Agent,
            ModeArg::Noagent => ConstructionMode::NoAgent,
        }
    }
}

/// Arguments for the build command.
#[derive(Debug, Parser)]
pub struct BuildArgs {
    /// Dataset name (e.g. hotpot, novel, building_assets)
    #[arg(short, long)]
    pub dataset: String,

    /// Corpus JSON file; defaults to the dataset's configured corpus
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Construction mode override
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Maximum concurrent documents
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Skip community detection
    #[arg(long)]
    pub no_communities: bool,
}

/// Arguments for the chunk command.
#[derive(Debug, Parser)]
pub struct ChunkArgs {
    /// Dataset name
    #[arg(short, long)]
    pub dataset: String,

    /// Corpus JSON file; defaults to the dataset's configured corpus
    #[arg(long)]
    pub corpus: Option<PathBuf>,
}

/// Arguments for the schema command.
#[derive(Debug, Parser)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub action: SchemaAction,
}

/// Schema subcommands.
#[derive(Debug, Subcommand)]
pub enum SchemaAction {
    /// Print a dataset's current schema
    Show {
        /// Dataset name
        #[arg(short, long)]
        dataset: String,
    },
}
