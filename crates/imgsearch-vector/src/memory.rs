//! Exact brute-force index held in memory, for tests and small corpora.
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use imgsearch_core::{Candidate, Embedding, Error, Result, VectorIndex};
use imgsearch_rank::cosine_similarity;

use crate::search::{check_query_dimension, IndexStats};

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    dimension: usize,
    namespaces: RwLock<BTreeMap<String, BTreeMap<String, Candidate>>>,
}

impl InMemoryIndex {
    pub fn new(dimension: usize) -> Self { Self { dimension, namespaces: RwLock::default() } }

    /// Inserts or replaces candidates by id.
    pub fn upsert(&self, namespace: &str, candidates: impl IntoIterator<Item = Candidate>) -> Result<usize> {
        let mut guard = self.namespaces.write().map_err(|_| Error::IndexUnavailable("in-memory index lock poisoned".into()))?;
        let ns = guard.entry(namespace.to_string()).or_default();
        let mut n = 0;
        for c in candidates {
            if c.embedding.dim() != self.dimension {
                return Err(Error::DimensionMismatch { expected: self.dimension, actual: c.embedding.dim() });
            }
            ns.insert(c.id.clone(), c);
            n += 1;
        }
        Ok(n)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let guard = self.namespaces.read().map_err(|_| Error::IndexUnavailable("in-memory index lock poisoned".into()))?;
        let namespaces: BTreeMap<String, usize> = guard.iter().map(|(k, v)| (k.clone(), v.len())).collect();
        let total_vectors = namespaces.values().sum();
        Ok(IndexStats { dimension: self.dimension, namespaces, total_vectors })
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn query(&self, vector: &Embedding, k: usize, namespace: &str) -> Result<Vec<Candidate>> {
        check_query_dimension(self.dimension, vector)?;
        let guard = self.namespaces.read().map_err(|_| Error::IndexUnavailable("in-memory index lock poisoned".into()))?;
        let Some(ns) = guard.get(namespace) else { return Ok(Vec::new()) };
        // Degenerate stored vectors are left for score fusion to skip.
        let mut scored: Vec<(f32, &Candidate)> = ns
            .values()
            .map(|c| (cosine_similarity(vector.as_slice(), c.embedding.as_slice()).unwrap_or(-1.0), c))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        Ok(scored.into_iter().take(k).map(|(_, c)| c.clone()).collect())
    }
}
