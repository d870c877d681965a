use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "typelens",
    version,
    about = "Receiver types of method calls in Ruby sources",
    long_about = "Scans a Ruby file for method call sites and asks a TypeProf language server for the class of each receiver."
)]
pub struct TypelensCli {
    #[command(subcommand)]
    pub command: Commands,
}

impl TypelensCli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve every method call site in a file
    Analyze(AnalyzeArgs),
    /// Resolve the type at one position
    Hover(HoverArgs),
    /// Evaluate an expression at a position
    Measure(MeasureArgs),
}

#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Type server executable
    #[arg(long, default_value = "typeprof")]
    pub server: String,

    /// Argument passed to the type server (repeatable)
    #[arg(
        long = "server-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        default_values = ["--lsp", "--stdio"]
    )]
    pub server_args: Vec<String>,

    /// Path to an analysis configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write logs to rolling files in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// With --log-dir, write JSON logs to the files only
    #[arg(long, default_value_t = false, requires = "log_dir")]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Ruby source file
    pub file: PathBuf,

    /// Print the full snapshot as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Args, Debug)]
pub struct HoverArgs {
    /// Ruby source file
    pub file: PathBuf,

    /// 1-based line
    pub line: u32,

    /// 1-based column
    pub col: u32,

    #[command(flatten)]
    pub server: ServerArgs,
}

#[derive(Args, Debug)]
pub struct MeasureArgs {
    /// Ruby source file
    pub file: PathBuf,

    /// Expression to evaluate
    pub expression: String,

    /// 1-based line
    pub line: u32,

    /// 1-based column
    pub col: u32,

    #[command(flatten)]
    pub server: ServerArgs,
}
