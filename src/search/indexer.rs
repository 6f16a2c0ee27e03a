use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::embedder::{embed_checked, Embedder};
use super::store::{DocumentRecord, DocumentStore};
use crate::error::{DocError, Result};

pub struct Indexer {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Default)]
pub struct IndexResult {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_pruned: usize,
    pub errors: Vec<String>,
}

impl Indexer {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Embed one page and upsert it under `module_path`. Returns the sequence
    /// number the record was stored with.
    pub async fn index(&self, module_path: &str, markdown: &str) -> Result<u64> {
        let vector = embed_checked(self.embedder.as_ref(), markdown).await?;
        let record = DocumentRecord {
            module_path: module_path.to_string(),
            markdown: markdown.to_string(),
            vector,
            content_hash: hash_content(markdown),
            indexed_at: Utc::now(),
            sequence: 0,
        };
        let sequence = self.store.upsert(record).await?;
        debug!(module_path, sequence, "indexed document");
        Ok(sequence)
    }

    /// Index every Markdown page under `docs_dir`, then prune records whose
    /// pages are gone and persist the store.
    pub async fn index_dir(&self, docs_dir: &Path, force: bool) -> Result<IndexResult> {
        let pages = markdown_pages(docs_dir)?;
        let mut result = IndexResult::default();

        self.store.load().await?;

        for (module_path, path) in &pages {
            let markdown = match fs::read_to_string(path) {
                Ok(markdown) => markdown,
                Err(e) => {
                    result.errors.push(format!("{}: {}", path.display(), e));
                    continue;
                }
            };

            if !force {
                // Vectors from another embedding model are re-embedded.
                if let Some(existing) = self.store.get(module_path).await? {
                    if existing.content_hash == hash_content(&markdown)
                        && existing.vector.len() == self.embedder.dimensions()
                    {
                        result.files_skipped += 1;
                        continue;
                    }
                }
            }

            match self.index(module_path, &markdown).await {
                Ok(_) => result.files_indexed += 1,
                Err(e) if e.is_unreachable() => {
                    // Keep what was indexed so far before giving up.
                    self.store.persist().await?;
                    return Err(e);
                }
                Err(e) => {
                    warn!(module_path = %module_path, error = %e, "failed to index page");
                    result.errors.push(format!("{}: {}", module_path, e));
                }
            }
        }

        let existing: HashSet<&str> = pages.iter().map(|(m, _)| m.as_str()).collect();
        for indexed in self.store.list().await? {
            if !existing.contains(indexed.as_str()) && self.store.remove(&indexed).await? {
                result.files_pruned += 1;
            }
        }

        self.store.persist().await?;
        info!(
            indexed = result.files_indexed,
            skipped = result.files_skipped,
            pruned = result.files_pruned,
            "index updated"
        );
        Ok(result)
    }
}

/// `(module_path, file)` for each `*.md` under `docs_dir`, sorted by module
/// path. Hidden files and directories are skipped.
fn markdown_pages(docs_dir: &Path) -> Result<Vec<(String, std::path::PathBuf)>> {
    if !docs_dir.is_dir() {
        return Err(DocError::io(
            docs_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "docs directory not found"),
        ));
    }

    let mut pages = Vec::new();
    let walker = WalkDir::new(docs_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(docs_dir).to_path_buf();
            DocError::io(path, std::io::Error::other(e.to_string()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(module_path) = module_path_for(docs_dir, entry.path()) {
            pages.push((module_path, entry.into_path()));
        }
    }

    pages.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(pages)
}

/// "pkg/shapes.py" for `<docs>/pkg/shapes.py.md`; `None` for non-Markdown files.
fn module_path_for(docs_dir: &Path, page: &Path) -> Option<String> {
    let relative = page.strip_prefix(docs_dir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let joined = parts.join("/");
    joined
        .strip_suffix(".md")
        .filter(|stem| !stem.is_empty() && !stem.ends_with('/'))
        .map(str::to_string)
}

fn hash_content(content: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}
