use serde::Serialize;

use imgsearch_core::{AttributeMap, ColorBucket, FilterCriteria, ScoredResult, ScoringWeights, SearchMode};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentScores {
    pub image: f32,
    pub text: f32,
    pub metadata: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub candidate_id: String,
    pub final_score: f32,
    pub component_scores: ComponentScores,
    pub metadata: AttributeMap,
}

impl From<ScoredResult> for RankedResult {
    fn from(r: ScoredResult) -> Self {
        Self {
            candidate_id: r.candidate.id,
            final_score: r.final_score,
            component_scores: ComponentScores { image: r.image_score, text: r.text_score, metadata: r.metadata_score },
            metadata: r.candidate.metadata,
        }
    }
}

/// What the orchestrator actually ran: resolved mode, post-redistribution
/// weights and retrieval sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveQuery {
    pub mode: SearchMode,
    pub query_text: Option<String>,
    pub has_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_text_weight: Option<f32>,
    pub weights: ScoringWeights,
    pub target_color: Option<ColorBucket>,
    pub filters: FilterCriteria,
    pub top_k: usize,
    pub top_k_candidates: usize,
    pub namespace: String,
    pub candidates_retrieved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSearchResponse {
    pub results: Vec<RankedResult>,
    pub count: usize,
    pub effective_query: EffectiveQuery,
    /// Ids of retrieved candidates that could not be scored.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl RankedSearchResponse {
    pub fn ids(&self) -> Vec<&str> { self.results.iter().map(|r| r.candidate_id.as_str()).collect() }
}
