//! Semantic search over generated Markdown pages.

pub mod embedder;
pub mod indexer;
pub mod searcher;
pub mod store;

pub use embedder::{create_embedder, Embedder, OllamaEmbedder};
pub use indexer::{IndexResult, Indexer};
pub use searcher::Searcher;
pub use store::{DocumentRecord, DocumentStore, IndexStats, JsonStore, SearchHit};

use std::path::{Path, PathBuf};

use crate::config::SearchConfig;

/// Location of the index file for a docs directory.
pub fn index_path(docs_dir: &Path, config: &SearchConfig) -> PathBuf {
    docs_dir.join(&config.index_file)
}
