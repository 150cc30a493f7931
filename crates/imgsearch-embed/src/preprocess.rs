//! CLIP image preprocessing: decode, resize-and-center-crop to 224x224,
//! convert to RGB and normalize with the CLIP mean/std, channel-first.
use anyhow::{Result, anyhow};
use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::DynamicImage;

pub const CLIP_IMAGE_SIZE: u32 = 224;
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_1];

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(anyhow!("image input is empty"));
    }
    image::load_from_memory(bytes).map_err(|e| anyhow!("failed to decode image: {e}"))
}

/// Normalized pixels in `[3, size, size]` order.
pub fn preprocess(img: &DynamicImage, size: u32) -> Vec<f32> {
    let rgb = img.resize_to_fill(size, size, FilterType::Triangle).to_rgb8();
    let plane = (size * size) as usize;
    let mut out = vec![0f32; 3 * plane];
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            out[c * plane + i] = (f32::from(pixel[c]) / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }
    out
}

/// `[1, 3, size, size]` input tensor for the vision tower.
pub fn image_tensor(bytes: &[u8], size: u32, device: &Device) -> Result<Tensor> {
    let img = decode_image(bytes)?;
    let s = size as usize;
    Ok(Tensor::from_vec(preprocess(&img, size), (1, 3, s, s), device)?)
}
