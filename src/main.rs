use clap::Parser;
use console::style;
use std::process::ExitCode;

use docenhancer::cli::{self, Args};
use docenhancer::error::DocError;
use docenhancer::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = cli::load_config(&args)?;
    init_logging(&config.logging, args.verbose)?;
    cli::run(args, config).await
}

/// `<Kind>: <message>` for library errors, anything else as a generic error.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<DocError>() {
        Some(doc) => format!("{}: {}", style(doc.kind()).for_stderr().red().bold(), doc),
        None => format!("{}: {:#}", style("Error").for_stderr().red().bold(), err),
    }
}
