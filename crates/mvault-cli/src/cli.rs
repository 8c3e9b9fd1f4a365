use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mvault",
    about = "ModelVault: content-addressed model manifest repository",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Models directory (overrides config file and MVAULT_MODELS)
    #[arg(long, global = true)]
    pub models: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Include synthetic manifests for built-in models
    #[arg(long, global = true)]
    pub synthetic: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List manifests
    List(ListArgs),
    /// Show one manifest
    Show(ShowArgs),
    /// Write a manifest from a JSON file holding `config` and `layers`
    Put(PutArgs),
    /// Remove a manifest and its unreferenced layers
    Rm(RmArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// Fail on the first unreadable manifest instead of skipping it
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub name: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub name: String,
    pub file: PathBuf,
}

#[derive(Args)]
pub struct RmArgs {
    pub name: String,
    /// Keep layer blobs on disk
    #[arg(long)]
    pub keep_layers: bool,
}
