use imgsearch_core::{CandidateColor, ColorBucket, Error, Result, Rgb};

/// Partial colour scores below this are reported as no match.
pub const NEAR_BUCKET_FLOOR: f32 = 0.5;

/// Cosine similarity `(a·b)/(|a||b|)`, in `[-1, 1]`.
///
/// Fails with [`Error::DimensionMismatch`] when the lengths differ and with
/// [`Error::DegenerateVector`] when either vector has zero (or non-finite) norm.
#[allow(clippy::cast_possible_truncation)]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch { expected: a.len(), actual: b.len() });
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if !denom.is_finite() || denom == 0.0 || !dot.is_finite() {
        return Err(Error::DegenerateVector);
    }
    Ok((dot / denom).clamp(-1.0, 1.0) as f32)
}

/// Rescales `v` to unit length.
pub fn l2_normalize(v: &[f32]) -> Result<Vec<f32>> {
    let norm = v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(Error::DegenerateVector);
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(v.iter().map(|x| (f64::from(*x) / norm) as f32).collect())
}

/// Similarity of a candidate's colour to a target bucket.
///
/// 1.0 when the candidate falls in the target bucket. Otherwise the RGB
/// distance to the bucket's reference colour, mapped to `1 - d/d_max`, counts
/// as a partial match if it reaches [`NEAR_BUCKET_FLOOR`]; anything further is 0.
pub fn color_similarity(candidate: &CandidateColor, target: ColorBucket) -> f32 {
    if candidate.bucket() == target {
        return 1.0;
    }
    let d = candidate.rgb().distance(&target.reference_rgb());
    let sim = (1.0 - d / Rgb::max_distance()).clamp(0.0, 1.0);
    if sim < NEAR_BUCKET_FLOOR { 0.0 } else { sim }
}
