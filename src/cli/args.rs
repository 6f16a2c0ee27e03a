use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "docenhancer")]
#[command(about = "LLM-enhanced Markdown documentation for Python modules", long_about = None)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: ./.docenhancer.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate documentation for a Python module
    Enhance(EnhanceArgs),

    /// Search generated documentation with a natural-language query
    Search(SearchArgs),

    /// Build or inspect the search index for a docs directory
    Index(IndexArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct EnhanceArgs {
    /// Path to the Python module
    #[arg(long)]
    pub module: PathBuf,

    /// Output directory for the Markdown files
    #[arg(short, long, default_value = "docs")]
    pub output: PathBuf,

    /// Completion backend: local, openai or anthropic
    #[arg(long)]
    pub provider: Option<String>,

    /// Backend model identifier (e.g. llama3.2, gpt-4o-mini)
    #[arg(long)]
    pub model: Option<String>,

    /// Language the documentation is written in
    #[arg(long)]
    pub language: Option<String>,

    /// Translate generated text into this language
    #[arg(long)]
    pub translate: Option<String>,

    /// API key for cloud providers
    #[arg(long)]
    pub api_key: Option<String>,

    /// Override the provider endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Provider request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Python interpreter used to run examples
    #[arg(long)]
    pub python: Option<String>,

    /// Do not execute docstring examples
    #[arg(long)]
    pub no_run_examples: bool,

    /// Also execute the generated example of each unit
    #[arg(long)]
    pub test_generated: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Natural-language query
    #[arg(short, long)]
    pub query: String,

    /// Directory with generated documentation
    #[arg(long, default_value = "docs")]
    pub docs_dir: PathBuf,

    /// Maximum number of results
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Re-embed every page, even unchanged ones
    #[arg(long)]
    pub reindex: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct IndexArgs {
    /// Directory with generated documentation
    #[arg(long, default_value = "docs")]
    pub docs_dir: PathBuf,

    /// Re-embed every page, even unchanged ones
    #[arg(long)]
    pub force: bool,

    /// Show index statistics instead of indexing
    #[arg(long, conflicts_with = "clear")]
    pub status: bool,

    /// Delete the index
    #[arg(long)]
    pub clear: bool,
}
