use anyhow::Result;
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use super::SearchArgs;
use crate::config::Config;
use crate::search::{create_embedder, index_path, DocumentStore, Indexer, JsonStore, Searcher};

static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "");
static FILE: Emoji<'_, '_> = Emoji("📄 ", "");

pub async fn run_search(config: &Config, args: &SearchArgs) -> Result<()> {
    let embedder = create_embedder(&config.search)?;
    let store: Arc<dyn DocumentStore> =
        Arc::new(JsonStore::new(index_path(&args.docs_dir, &config.search)));

    // Bring the index up to date with the docs directory first.
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Indexing {}...", args.docs_dir.display()));
    pb.enable_steady_tick(Duration::from_millis(100));
    let indexer = Indexer::new(Arc::clone(&store), Arc::clone(&embedder));
    let indexed = indexer.index_dir(&args.docs_dir, args.reindex).await;
    pb.finish_and_clear();
    indexed?;

    let limit = args.limit.unwrap_or(config.search.limit);
    let searcher = Searcher::new(store, embedder);
    let results = searcher.search(&args.query, limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for: {}", style(&args.query).italic());
        return Ok(());
    }

    println!(
        "\n{}Found {} results for: {}\n",
        SEARCH,
        style(results.len()).cyan(),
        style(&args.query).yellow().bold()
    );
    for (i, hit) in results.iter().enumerate() {
        println!(
            "{} {}. {}  {}",
            FILE,
            style(i + 1).dim(),
            style(&hit.module_path).green(),
            style(format!("{:.3}", hit.score)).cyan()
        );
    }

    Ok(())
}
