mod args;
mod enhance;
mod index;
mod search;

pub use args::{Args, Command, EnhanceArgs, IndexArgs, SearchArgs};
pub use enhance::run_enhance;
pub use index::{run_index, run_index_clear, run_index_status};
pub use search::run_search;

use crate::config::Config;
use crate::error::Result;

/// File configuration with environment overrides applied. CLI flags are
/// layered on top by each command.
pub fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

pub async fn run(args: Args, config: Config) -> anyhow::Result<()> {
    match args.command {
        Command::Enhance(enhance) => run_enhance(config, &enhance).await,
        Command::Search(search) => run_search(&config, &search).await,
        Command::Index(index) => {
            if index.clear {
                run_index_clear(&config, &index.docs_dir).await
            } else if index.status {
                run_index_status(&config, &index.docs_dir).await
            } else {
                run_index(&config, &index.docs_dir, index.force).await
            }
        }
    }
}
