use anyhow::Result;
use candle_core::{DType, Tensor};

/// Row-wise L2 normalization of a `[B, H]` feature tensor.
pub fn l2_normalize_rows(features: &Tensor) -> Result<Tensor> {
    let eps_val = match features.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], features.device())?.to_dtype(features.dtype())?.unsqueeze(0)?;
    let norm = features.sqr()?.sum_keepdim(1)?.sqrt()?;
    let norm = norm.broadcast_add(&eps)?;
    Ok(features.broadcast_div(&norm)?)
}

/// First row of a `[1, H]` tensor as an f32 vector on the CPU.
pub fn first_row(features: &Tensor) -> Result<Vec<f32>> {
    Ok(features.to_dtype(DType::F32)?.to_device(&candle_core::Device::Cpu)?.squeeze(0)?.to_vec1()?)
}
