use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One indexed Markdown page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    /// Markdown path relative to the docs directory, without `.md`
    pub module_path: String,
    pub markdown: String,
    pub vector: Vec<f32>,
    pub content_hash: String,
    pub indexed_at: DateTime<Utc>,
    /// Monotonic per store; later indexing gets a higher number
    pub sequence: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub module_path: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub index_size_bytes: u64,
    pub last_updated: Option<DateTime<Utc>>,
}
