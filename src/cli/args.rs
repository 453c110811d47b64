//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, db::DbCommands, schema::SchemaCommands,
};

#[derive(Parser)]
#[command(name = "taxonopy")]
#[command(author, version, about = "Build schema-shaped records from tree taxonomies")]
#[command(long_about = "Describe a taxonomy as a schema tree, then fill it in interactively or from a spreadsheet and keep the resulting records in a small document store.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct GlobalOpts {
    /// Schema file (default: from config, then ./schema.json)
    #[arg(long, short = 's', global = true)]
    pub schema: Option<PathBuf>,

    /// Record store (default: from config, then ./db.sqlite)
    #[arg(long, short = 'd', global = true)]
    pub db: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create and edit the schema tree
    #[command(subcommand)]
    Schema(SchemaCommands),

    /// Build, query and exchange records
    #[command(subcommand)]
    Db(DbCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
