use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "callheat")]
#[command(about = "Map a Python codebase's call graph and rank its hotspot functions")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a file or directory and print the hotspot summary
    Map {
        /// File or directory to analyze
        path: PathBuf,

        /// Comma-separated substrings matched against name, path, docstring or file
        #[arg(short, long)]
        focus: Option<String>,

        /// Also write the graph as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Also write the Markdown digest
        #[arg(long)]
        markdown: Option<PathBuf>,
    },

    /// Render the Markdown digest
    Report {
        /// File or directory to analyze
        path: PathBuf,

        /// Comma-separated substrings matched against name, path, docstring or file
        #[arg(short, long)]
        focus: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default Callheat.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Map { path, focus, json, markdown } => {
                engine.map(path, focus, json, markdown).await
            }
            Commands::Report { path, focus, output } => {
                engine.report(path, focus, output).await
            }
            Commands::Init { path } => {
                engine.init(path).await
            }
        }
    }
}
