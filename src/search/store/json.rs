use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{cosine_similarity, DocumentRecord, DocumentStore, IndexStats, SearchHit};
use crate::error::{DocError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexData {
    next_sequence: u64,
    records: BTreeMap<String, DocumentRecord>,
}

/// Index kept in memory and persisted as a single JSON file.
pub struct JsonStore {
    path: PathBuf,
    data: RwLock<IndexData>,
}

impl JsonStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(IndexData::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn atomic_write(&self, data: &IndexData) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DocError::io(parent, e))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let json = serde_json::to_vec(data)
            .map_err(|e| DocError::io(&self.path, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        fs::write(&temp_path, json).map_err(|e| DocError::io(&temp_path, e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| DocError::io(&self.path, e))?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonStore {
    async fn upsert(&self, mut record: DocumentRecord) -> Result<u64> {
        let mut data = self.write();
        data.next_sequence += 1;
        record.sequence = data.next_sequence;
        let sequence = record.sequence;
        data.records.insert(record.module_path.clone(), record);
        Ok(sequence)
    }

    async fn get(&self, module_path: &str) -> Result<Option<DocumentRecord>> {
        Ok(self.read().records.get(module_path).cloned())
    }

    async fn remove(&self, module_path: &str) -> Result<bool> {
        Ok(self.write().records.remove(module_path).is_some())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.read().records.keys().cloned().collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read().records.len())
    }

    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let data = self.read();

        let mut scored: Vec<(f32, u64, &str)> = data
            .records
            .values()
            .map(|r| {
                (
                    cosine_similarity(query_vector, &r.vector),
                    r.sequence,
                    r.module_path.as_str(),
                )
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.cmp(&a.1))
        });
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(score, _, module_path)| SearchHit {
                module_path: module_path.to_string(),
                score,
            })
            .collect())
    }

    async fn persist(&self) -> Result<()> {
        let data = self.read();
        self.atomic_write(&data)
    }

    async fn load(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let content = fs::read(&self.path).map_err(|e| DocError::io(&self.path, e))?;
        let loaded: IndexData = serde_json::from_slice(&content).map_err(|e| {
            DocError::io(
                &self.path,
                io::Error::new(io::ErrorKind::InvalidData, format!("corrupt index: {}", e)),
            )
        })?;

        *self.write() = loaded;
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let data = self.read();

        let index_size_bytes = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(DocError::io(&self.path, e)),
        };

        Ok(IndexStats {
            total_documents: data.records.len(),
            index_size_bytes,
            last_updated: data.records.values().map(|r| r.indexed_at).max(),
        })
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.write();
        *data = IndexData::default();

        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| DocError::io(&self.path, e))?;
        }

        Ok(())
    }
}
