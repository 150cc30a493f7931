use anyhow::{Result, anyhow};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// CLIP context length.
pub const MAX_TOKENS: usize = 77;
pub const PAD_TOKEN: &str = "<|endoftext|>";

/// Encodes `text` into a `[1, max_len]` id tensor, truncated and padded with
/// [`PAD_TOKEN`]. CLIP pools at the highest token id (end of text), so padding
/// with the same token keeps the pooled position at its first occurrence.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> Result<Tensor> {
    let pad_id = tokenizer.token_to_id(PAD_TOKEN).ok_or_else(|| anyhow!("tokenizer has no {PAD_TOKEN} token"))?;
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let mut ids = enc.get_ids().to_vec();
    if ids.len() > max_len {
        ids.truncate(max_len);
        // keep the end-of-text marker that pooling relies on
        if let Some(last) = ids.last_mut() { *last = pad_id; }
    }
    ids.resize(max_len, pad_id);
    Ok(Tensor::new(ids.as_slice(), device)?.unsqueeze(0)?)
}
