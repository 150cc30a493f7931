//! Weighted fusion of image, text and metadata similarity.
//!
//! Weight redistribution: a signal the query does not carry (no image
//! embedding, no text embedding, no target colour) has its weight removed and
//! the remaining weights are rescaled to sum to 1 before combination. A
//! TextOnly query without a colour therefore scores purely on text.
//!
//! Candidates whose embedding cannot be compared with the query (dimension
//! mismatch, zero norm) are skipped with a warning; the batch continues.
//! Output order follows input order minus skipped candidates; no sorting here.

use imgsearch_core::{Candidate, ColorBucket, QueryContext, Result, ScoredResult, ScoringWeights};
use tracing::warn;

use crate::similarity::{color_similarity, cosine_similarity};

/// A candidate dropped during fusion and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCandidate {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fused {
    pub results: Vec<ScoredResult>,
    pub skipped: Vec<SkippedCandidate>,
    /// Weights actually applied after redistribution.
    pub weights: ScoringWeights,
}

pub fn fuse<I>(
    candidates: I,
    ctx: &QueryContext,
    weights: &ScoringWeights,
    target_color: Option<ColorBucket>,
) -> Result<Vec<ScoredResult>>
where
    I: IntoIterator<Item = Candidate>,
{
    fuse_with_report(candidates, ctx, weights, target_color).map(|f| f.results)
}

/// Like [`fuse`], also reporting skipped candidates and the effective weights.
///
/// Fails only with `Error::InvalidWeights` when none of the signals present
/// in the query has any weight.
pub fn fuse_with_report<I>(
    candidates: I,
    ctx: &QueryContext,
    weights: &ScoringWeights,
    target_color: Option<ColorBucket>,
) -> Result<Fused>
where
    I: IntoIterator<Item = Candidate>,
{
    let image_query = ctx.image_embedding();
    let text_query = ctx.text_embedding();
    let effective = weights.redistribute(image_query.is_some(), text_query.is_some(), target_color.is_some())?;

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for candidate in candidates {
        let scores = signal_score(&candidate, image_query.map(|q| q.as_slice()))
            .and_then(|image| signal_score(&candidate, text_query.map(|q| q.as_slice())).map(|text| (image, text)));
        let (image_score, text_score) = match scores {
            Ok(s) => s,
            Err(e) => {
                warn!(candidate = %candidate.id, error = %e, "skipping candidate during score fusion");
                skipped.push(SkippedCandidate { id: candidate.id, reason: e.to_string() });
                continue;
            }
        };
        let metadata_score = match (target_color, candidate.color()) {
            (Some(target), Some(color)) => color_similarity(&color, target),
            _ => 0.0,
        };
        let final_score = (effective.image_weight() * image_score
            + effective.text_weight() * text_score
            + effective.metadata_weight() * metadata_score)
            .clamp(0.0, 1.0);
        results.push(ScoredResult { candidate, image_score, text_score, metadata_score, final_score });
    }
    Ok(Fused { results, skipped, weights: effective })
}

// Query first so a mismatch reports the query dimension as expected.
fn signal_score(candidate: &Candidate, query: Option<&[f32]>) -> Result<f32> {
    match query {
        Some(q) => cosine_similarity(q, candidate.embedding.as_slice()),
        None => Ok(0.0),
    }
}
