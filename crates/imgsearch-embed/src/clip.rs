use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{ClipConfig, ClipModel};
use tokenizers::Tokenizer;

use imgsearch_core::{Embedding, EmbeddingService, Error, ImageInput};

use crate::device::select_device;
use crate::pool::{first_row, l2_normalize_rows};
use crate::preprocess::image_tensor;
use crate::tokenize::{tokenize_on_device, MAX_TOKENS};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

struct ClipInner { model: ClipModel, tokenizer: Tokenizer, device: Device, image_size: u32, dim: usize }

/// CLIP ViT-B/32 text and image encoder. Both towers project into the same
/// 512-d space; outputs are L2-normalized.
#[derive(Clone)]
pub struct ClipEmbedder { inner: Arc<ClipInner>, http: reqwest::Client }

impl ClipEmbedder {
    /// Loads `tokenizer.json` plus `model.safetensors` (or `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(model_dir = %model_dir.display(), "loading CLIP model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config = ClipConfig::vit_base_patch32();
        let safetensors = model_dir.join("model.safetensors");
        let weights: std::collections::HashMap<String, Tensor> = if safetensors.exists() {
            candle_core::safetensors::load(&safetensors, &device)?
        } else {
            candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?.into_iter().collect()
        };
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = ClipModel::new(vb, &config)?;
        let image_size = u32::try_from(config.image_size)?;
        let dim = config.text_config.projection_dim;
        let http = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        info!(dim, "CLIP model loaded");
        Ok(Self { inner: Arc::new(ClipInner { model, tokenizer, device, image_size, dim }), http })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.http.get(url).send().await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}

impl ClipInner {
    fn text_features(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let ids = tokenize_on_device(&self.tokenizer, text, MAX_TOKENS, &self.device)?;
        let features = l2_normalize_rows(&self.model.get_text_features(&ids)?)?;
        let v = first_row(&features)?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "text embedded");
        Ok(v)
    }

    fn image_features(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let start = Instant::now();
        let pixels = image_tensor(bytes, self.image_size, &self.device)?;
        let features = l2_normalize_rows(&self.model.get_image_features(&pixels)?)?;
        let v = first_row(&features)?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 500 { warn!(elapsed_ms = elapsed.as_millis() as u64, "slow image embedding"); }
        Ok(v)
    }
}

fn unavailable(e: impl std::fmt::Display) -> Error { Error::EmbeddingUnavailable(e.to_string()) }

#[async_trait]
impl EmbeddingService for ClipEmbedder {
    fn dim(&self) -> usize { self.inner.dim }

    async fn embed_text(&self, text: &str) -> imgsearch_core::Result<Embedding> {
        if text.trim().is_empty() { return Err(unavailable("text must not be empty")); }
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || inner.text_features(&text))
            .await
            .map_err(unavailable)?
            .map(Embedding::new)
            .map_err(|e| unavailable(format!("{e:#}")))
    }

    async fn embed_image(&self, image: &ImageInput) -> imgsearch_core::Result<Embedding> {
        let bytes = match image {
            ImageInput::Bytes(b) => b.clone(),
            ImageInput::Url(url) => self.fetch(url).await.map_err(|e| unavailable(format!("failed to retrieve image: {e:#}")))?,
        };
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.image_features(&bytes))
            .await
            .map_err(unavailable)?
            .map(Embedding::new)
            .map_err(|e| unavailable(format!("{e:#}")))
    }
}
