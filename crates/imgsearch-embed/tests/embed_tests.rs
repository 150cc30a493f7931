use std::io::Cursor;

use candle_core::{Device, Tensor};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imgsearch_core::config::EmbeddingSettings;
use imgsearch_core::{EmbeddingService, Error, ImageInput};
use imgsearch_embed::preprocess::{image_tensor, CLIP_MEAN, CLIP_STD};
use imgsearch_embed::{get_default_embedder, pool, FakeEmbedder};

fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode png");
    out.into_inner()
}

fn norm(v: &[f32]) -> f32 { v.iter().map(|x| x * x).sum::<f32>().sqrt() }

#[tokio::test]
async fn fake_embedder_shapes_and_determinism() {
    let embedder = get_default_embedder(&EmbeddingSettings { use_fake: true, ..Default::default() }, 512).expect("embedder");
    assert_eq!(embedder.dim(), 512);
    let a = embedder.embed_text("red barn at sunset").await.expect("text");
    let b = embedder.embed_text("red barn at sunset").await.expect("text");
    assert_eq!(a.dim(), 512);
    assert!((norm(a.as_slice()) - 1.0).abs() <= 1e-3, "vector is L2-normalized");
    assert_eq!(a, b);
    let c = embedder.embed_text("blue ocean").await.expect("text");
    assert_ne!(a, c);
}

#[tokio::test]
async fn fake_embedder_images_and_failures() {
    let embedder = FakeEmbedder::new(64);
    let bytes = png(8, 8, [10, 200, 30]);
    let v = embedder.embed_image(&ImageInput::Bytes(bytes.clone())).await.expect("image");
    assert_eq!(v.dim(), 64);
    assert!((norm(v.as_slice()) - 1.0).abs() <= 1e-3);
    assert_eq!(v, embedder.embed_image(&ImageInput::Bytes(bytes)).await.expect("image"));
    let u = embedder.embed_image(&ImageInput::Url("https://example.com/a.jpg".into())).await.expect("url");
    assert!((norm(u.as_slice()) - 1.0).abs() <= 1e-3);

    assert!(matches!(embedder.embed_text("   ").await, Err(Error::EmbeddingUnavailable(_))));
    let err = embedder.embed_image(&ImageInput::Bytes(Vec::new())).await.unwrap_err();
    assert!(err.is_retryable());
}

#[test]
fn image_preprocessing_is_channel_first_and_normalized() {
    let tensor = image_tensor(&png(40, 20, [255, 0, 0]), 224, &Device::Cpu).expect("tensor");
    assert_eq!(tensor.dims(), &[1, 3, 224, 224]);
    let values: Vec<f32> = tensor.flatten_all().expect("flatten").to_vec1().expect("vec");
    let plane = 224 * 224;
    let red = (1.0 - CLIP_MEAN[0]) / CLIP_STD[0];
    let green = (0.0 - CLIP_MEAN[1]) / CLIP_STD[1];
    assert!((values[0] - red).abs() < 1e-4);
    assert!((values[plane] - green).abs() < 1e-4);
}

#[test]
fn undecodable_image_is_an_error() {
    assert!(image_tensor(b"not an image", 224, &Device::Cpu).is_err());
    assert!(image_tensor(&[], 224, &Device::Cpu).is_err());
}

#[test]
fn l2_normalize_rows_basic() {
    let t = Tensor::from_slice(&[3.0f32, 4.0], (1, 2), &Device::Cpu).expect("tensor");
    let v = pool::first_row(&pool::l2_normalize_rows(&t).expect("norm")).expect("row");
    assert!((v[0] - 0.6).abs() < 1e-6);
    assert!((v[1] - 0.8).abs() < 1e-6);
}
