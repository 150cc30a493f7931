//! imgsearch-embed
//!
//! Embedding service implementations: a CLIP ViT-B/32 encoder on candle and a
//! deterministic hashing embedder for tests and offline use.

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

use imgsearch_core::config::{expand_path, EmbeddingSettings};
use imgsearch_core::EmbeddingService;

pub mod clip;
pub mod device;
pub mod fake;
pub mod pool;
pub mod preprocess;
pub mod tokenize;

pub use clip::ClipEmbedder;
pub use fake::FakeEmbedder;

/// Output dimension of CLIP ViT-B/32.
pub const CLIP_DIM: usize = 512;

/// `APP_USE_FAKE_EMBEDDINGS=1|true` forces the fake embedder regardless of settings.
pub fn fake_requested(settings: &EmbeddingSettings) -> bool {
    let env = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    env || settings.use_fake
}

pub fn get_default_embedder(settings: &EmbeddingSettings, dim: usize) -> Result<Box<dyn EmbeddingService>> {
    if fake_requested(settings) { info!(dim, "using FakeEmbedder"); return Ok(Box::new(FakeEmbedder::new(dim))); }
    let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
    let clip = ClipEmbedder::load(&model_dir)?;
    if clip.dim() != dim {
        return Err(anyhow!("CLIP model produces {}-d embeddings but the index expects {dim}", clip.dim()));
    }
    Ok(Box::new(clip))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured { let p = expand_path(dir); if p.exists() { return Ok(p); } }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { info!(dir = %p.display(), "using APP_MODEL_DIR"); return Ok(p); } }
    if let Ok(dir) = std::env::var("MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { info!(dir = %p.display(), "using MODEL_DIR"); return Ok(p); } }
    let root = Path::new("../models/clip-vit-base-patch32"); if root.exists() { return Ok(root.to_path_buf()); }
    let local = Path::new("models/clip-vit-base-patch32"); if local.exists() { return Ok(local.to_path_buf()); }
    Err(anyhow!("Could not locate CLIP model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}
