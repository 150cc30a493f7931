use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use imgsearch_core::{Embedding, EmbeddingService, Error, ImageInput};

/// Deterministic hashing embedder for tests and offline runs.
///
/// Text hashes whitespace tokens into buckets; images hash fixed-size byte
/// windows (URLs hash the URL string). Outputs are unit length and never zero.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn bucket(&self, h: u64) -> usize { (h % self.dim as u64) as usize }

    pub fn text_vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let h = hash(&token.to_lowercase());
            v[self.bucket(h)] += weight(h) + (i as f32 % 3.0) * 0.01;
        }
        normalize_or_seed(v, hash(text), self)
    }

    pub fn bytes_vector(&self, bytes: &[u8]) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for window in bytes.chunks(64) {
            let h = hash(&window);
            v[self.bucket(h)] += weight(h);
        }
        normalize_or_seed(v, hash(&bytes), self)
    }
}

fn hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    value.hash(&mut hasher);
    hasher.finish()
}

fn weight(h: u64) -> f32 { (((h >> 32) as u32) as f32) / (u32::MAX as f32) + 0.05 }

fn normalize_or_seed(mut v: Vec<f32>, seed: u64, e: &FakeEmbedder) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        v[e.bucket(seed)] = 1.0;
        return v;
    }
    for x in &mut v { *x /= norm; }
    v
}

#[async_trait]
impl EmbeddingService for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }

    async fn embed_text(&self, text: &str) -> imgsearch_core::Result<Embedding> {
        if text.trim().is_empty() {
            return Err(Error::EmbeddingUnavailable("text must not be empty".into()));
        }
        Ok(Embedding::new(self.text_vector(text)))
    }

    async fn embed_image(&self, image: &ImageInput) -> imgsearch_core::Result<Embedding> {
        match image {
            ImageInput::Bytes(b) if b.is_empty() => Err(Error::EmbeddingUnavailable("image input is empty".into())),
            ImageInput::Bytes(b) => Ok(Embedding::new(self.bytes_vector(b))),
            ImageInput::Url(url) if url.trim().is_empty() => Err(Error::EmbeddingUnavailable("image URL is empty".into())),
            ImageInput::Url(url) => Ok(Embedding::new(self.bytes_vector(url.as_bytes()))),
        }
    }
}
