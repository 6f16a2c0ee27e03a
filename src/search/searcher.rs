use std::sync::Arc;
use tracing::debug;

use super::embedder::{embed_checked, Embedder};
use super::store::{DocumentStore, SearchHit};
use crate::error::{DocError, Result};

pub struct Searcher {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
}

impl Searcher {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Top `limit` pages by cosine similarity to `query`.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if self.store.len().await? == 0 {
            self.store.load().await?;
        }
        if self.store.len().await? == 0 {
            return Err(DocError::IndexEmpty);
        }

        let query_vector = embed_checked(self.embedder.as_ref(), query).await?;
        let hits = self.store.search(&query_vector, limit).await?;
        debug!(query, hits = hits.len(), "search complete");
        Ok(hits)
    }
}
