//! Contracts for the external collaborators the search core depends on.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Candidate, Embedding};

/// Image signal of a query: raw bytes (uploads) or a URL to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Bytes(Vec<u8>),
    Url(String),
}

/// Produces text and image embeddings in one shared space of dimension [`EmbeddingService::dim`].
///
/// Failures surface as [`crate::Error::EmbeddingUnavailable`].
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed_text(&self, text: &str) -> Result<Embedding>;
    async fn embed_image(&self, image: &ImageInput) -> Result<Embedding>;
}

/// Approximate nearest-neighbour search over stored candidates.
///
/// Returns up to `k` candidates ranked by the index's own metric; fewer when
/// the namespace holds fewer entries. Failures surface as
/// [`crate::Error::IndexUnavailable`].
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn query(&self, vector: &Embedding, k: usize, namespace: &str) -> Result<Vec<Candidate>>;
}
