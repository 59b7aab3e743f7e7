//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use infer_playground::runtime::ViewMode;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON config file (defaults to $INFER_PLAYGROUND_CONFIG)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,
    /// Engine module: a local path or an http(s) URL
    #[arg(short = 'e', long, global = true)]
    pub engine: Option<String>,
    /// WASI runner used to execute the engine module
    #[arg(short = 'r', long, global = true)]
    pub runtime: Option<PathBuf>,
    /// Raise log verbosity (repeatable)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    Tree,
    Linear,
}

impl From<ViewArg> for ViewMode {
    fn from(value: ViewArg) -> Self {
        match value {
            ViewArg::Tree => ViewMode::Tree,
            ViewArg::Linear => ViewMode::Linear,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the engine's algorithms and rules
    Meta {
        #[arg(long)]
        json: bool,
    },
    /// Infer the type of an expression
    Infer {
        #[arg(short = 'a', long)]
        algorithm: Option<String>,
        #[arg(long)]
        variant: Option<String>,
        #[arg(long, value_enum, default_value_t = ViewArg::Tree)]
        view: ViewArg,
        /// Start with every derivation node collapsed
        #[arg(long)]
        collapsed: bool,
        #[arg(long)]
        json: bool,
        expression: String,
    },
    /// Check a subtyping query written as "<A> <: <B>"
    Subtype {
        #[arg(short = 'a', long)]
        algorithm: Option<String>,
        #[arg(long)]
        variant: Option<String>,
        #[arg(long, value_enum, default_value_t = ViewArg::Tree)]
        view: ViewArg,
        #[arg(long)]
        json: bool,
        query: String,
    },
    /// Run every algorithm against every expression
    Compare {
        #[arg(long, value_delimiter = ',', required = true)]
        algorithms: Vec<String>,
        #[arg(long = "expressions", required = true)]
        expressions: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print a shareable link
    Share {
        #[arg(short = 'a', long)]
        algorithm: Option<String>,
        #[arg(long)]
        variant: Option<String>,
        #[arg(long)]
        expression: Option<String>,
        /// Share a comparison instead of a single run
        #[arg(long, value_delimiter = ',')]
        algorithms: Vec<String>,
        #[arg(long = "expressions")]
        expressions: Vec<String>,
    },
    /// Decode a shared link and run it
    Open {
        url: String,
        #[arg(long, value_enum, default_value_t = ViewArg::Tree)]
        view: ViewArg,
    },
    /// Interactive session
    Repl {
        #[arg(short = 'a', long)]
        algorithm: Option<String>,
    },
}
