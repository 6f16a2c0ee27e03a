mod json;
mod types;

pub use json::JsonStore;
pub use types::{DocumentRecord, IndexStats, SearchHit};

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the record for `record.module_path`, assigning it
    /// the next sequence number. Returns the assigned sequence.
    async fn upsert(&self, record: DocumentRecord) -> Result<u64>;
    async fn get(&self, module_path: &str) -> Result<Option<DocumentRecord>>;
    async fn remove(&self, module_path: &str) -> Result<bool>;
    async fn list(&self) -> Result<Vec<String>>;
    async fn len(&self) -> Result<usize>;
    /// Ranked by score descending, ties broken by higher sequence.
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchHit>>;
    async fn persist(&self) -> Result<()>;
    async fn load(&self) -> Result<()>;
    async fn stats(&self) -> Result<IndexStats>;
    async fn clear(&self) -> Result<()>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
