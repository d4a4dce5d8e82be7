//! CLI argument definitions using clap
//!
//! Commands:
//! - catalogql query --catalog <path> --query <path> [--config <path>]
//! - catalogql validate --catalog <path> --query <path> [--config <path>]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// catalogql - declarative catalog query evaluator
#[derive(Parser, Debug)]
#[command(name = "catalogql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log filter written to stderr (`warn`, `debug`, `catalogql=trace`, ...)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Inputs shared by every command
#[derive(Args, Debug, Clone)]
pub struct Inputs {
    /// Catalog snapshot (JSON)
    #[arg(long)]
    pub catalog: PathBuf,

    /// Query (JSON); `-` reads stdin
    #[arg(long, default_value = "-")]
    pub query: PathBuf,

    /// Evaluator configuration (JSON); defaults apply when absent
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a query and print the response
    Query(Inputs),

    /// Check a query against the catalog schemas without evaluating it
    Validate(Inputs),
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
