//! Post-retrieval filtering and deterministic ordering of scored results.
//!
//! All supplied criteria are combined with AND. A criterion only rejects a
//! candidate that carries the attribute it constrains: no `color`, no
//! orientation (explicit or from width/height) or no `created_at` passes.
//! A `created_at` that is present but unparseable fails a date range.

use std::cmp::Ordering;

use imgsearch_core::{FilterCriteria, ScoredResult};

/// Keeps results satisfying every criterion; survivors keep their relative order.
pub fn filter(results: Vec<ScoredResult>, criteria: &FilterCriteria) -> Vec<ScoredResult> {
    if criteria.is_empty() {
        return results;
    }
    results.into_iter().filter(|r| matches(r, criteria)).collect()
}

pub fn matches(result: &ScoredResult, criteria: &FilterCriteria) -> bool {
    if let Some(min) = criteria.min_score {
        if result.final_score < min {
            return false;
        }
    }
    let candidate = &result.candidate;
    if let Some(color) = criteria.color {
        if candidate.attr_str("color").is_some() && candidate.color_bucket() != Some(color) {
            return false;
        }
    }
    if let Some(orientation) = criteria.orientation {
        if candidate.orientation().is_some_and(|o| o != orientation) {
            return false;
        }
    }
    if (criteria.date_from.is_some() || criteria.date_to.is_some()) && candidate.attr_str("created_at").is_some() {
        let Some(created) = candidate.created_on() else {
            return false;
        };
        if criteria.date_from.is_some_and(|from| created < from) {
            return false;
        }
        if criteria.date_to.is_some_and(|to| created > to) {
            return false;
        }
    }
    true
}

/// Sorts by `final_score` descending, ties by candidate id ascending.
pub fn sort(mut results: Vec<ScoredResult>) -> Vec<ScoredResult> {
    results.sort_by(compare);
    results
}

/// Filter, sort, then truncate to `top_k`. Truncation always comes last so the
/// returned results are the true top `top_k` of the survivors.
pub fn rank(results: Vec<ScoredResult>, criteria: &FilterCriteria, top_k: usize) -> Vec<ScoredResult> {
    let mut ranked = sort(filter(results, criteria));
    ranked.truncate(top_k);
    ranked
}

fn compare(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    // partial_cmp keeps -0.0 == 0.0; fused scores are never NaN.
    b.final_score
        .partial_cmp(&a.final_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}
