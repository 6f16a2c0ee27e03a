use anyhow::Result;
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::DocError;
use crate::search::{create_embedder, index_path, DocumentStore, Indexer, JsonStore};

static INDEXING: Emoji<'_, '_> = Emoji("📊 ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "");
static ERROR: Emoji<'_, '_> = Emoji("❌ ", "");
static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "");

pub async fn run_index(config: &Config, docs_dir: &Path, force: bool) -> Result<()> {
    let embedder = create_embedder(&config.search)?;
    embedder.health_check().await.map_err(DocError::from)?;

    let store: Arc<dyn DocumentStore> =
        Arc::new(JsonStore::new(index_path(docs_dir, &config.search)));
    let indexer = Indexer::new(Arc::clone(&store), embedder);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("{}Indexing {}...", INDEXING, docs_dir.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let outcome = indexer.index_dir(docs_dir, force).await;
    pb.finish_and_clear();
    let result = outcome?;

    println!("\n{}Indexing complete!\n", SUCCESS);
    println!("  Pages indexed:   {}", style(result.files_indexed).green());
    println!(
        "  Pages skipped:   {} (unchanged)",
        style(result.files_skipped).dim()
    );
    if result.files_pruned > 0 {
        println!(
            "  Pruned:          {} (deleted pages removed from index)",
            style(result.files_pruned).yellow()
        );
    }

    if !result.errors.is_empty() {
        println!("\n{}Errors ({}):", ERROR, result.errors.len());
        for error in result.errors.iter().take(10) {
            println!("  - {}", style(error).red());
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more", result.errors.len() - 10);
        }
    }

    print_stats(store.as_ref()).await
}

pub async fn run_index_status(config: &Config, docs_dir: &Path) -> Result<()> {
    let store_path = index_path(docs_dir, &config.search);

    if !store_path.exists() {
        println!("{}No index found at {}", INFO, store_path.display());
        println!("Run `docenhancer index` to build the search index.");
        return Ok(());
    }

    let store = JsonStore::new(store_path);
    store.load().await?;
    println!("\n{}Index Status: {}", INFO, store.path().display());
    print_stats(&store).await
}

pub async fn run_index_clear(config: &Config, docs_dir: &Path) -> Result<()> {
    let store_path = index_path(docs_dir, &config.search);

    if !store_path.exists() {
        println!("{}No index found.", INFO);
        return Ok(());
    }

    let store = JsonStore::new(store_path);
    store.clear().await?;

    println!("{}Index cleared successfully.", SUCCESS);
    Ok(())
}

async fn print_stats(store: &dyn DocumentStore) -> Result<()> {
    let stats = store.stats().await?;
    println!("\n  Total pages:     {}", style(stats.total_documents).green());
    println!(
        "  Index size:      {} KB",
        style(stats.index_size_bytes / 1024).yellow()
    );
    if let Some(updated) = stats.last_updated {
        println!(
            "  Last updated:    {}",
            style(updated.format("%Y-%m-%d %H:%M:%S")).dim()
        );
    }
    Ok(())
}
