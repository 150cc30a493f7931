use imgsearch_core::config::SearchSettings;
use imgsearch_core::{ColorBucket, Error, FilterCriteria, ImageInput, Result, ScoringWeights, SearchMode};

/// Loosely shaped client request, validated into a query context by the orchestrator.
///
/// A missing `mode` is inferred from the signals present. Absent `weights`,
/// `hybrid_text_weight` and `filters.min_score` fall back to the search settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQueryInput {
    pub query_text: Option<String>,
    pub query_image: Option<ImageInput>,
    pub mode: Option<SearchMode>,
    pub hybrid_text_weight: Option<f32>,
    pub weights: Option<ScoringWeights>,
    pub filters: FilterCriteria,
    /// Soft colour preference feeding the metadata score.
    pub target_color: Option<ColorBucket>,
    pub top_k: Option<usize>,
}

impl RawQueryInput {
    pub fn text(text: impl Into<String>) -> Self { Self { query_text: Some(text.into()), ..Default::default() } }

    pub fn image(image: ImageInput) -> Self { Self { query_image: Some(image), ..Default::default() } }

    /// Query text with surrounding whitespace removed; blank text counts as absent.
    pub fn trimmed_text(&self) -> Option<&str> { self.query_text.as_deref().map(str::trim).filter(|t| !t.is_empty()) }

    /// The mode to run: explicit, or inferred from which signals are present.
    ///
    /// Fails with [`Error::InvalidInput`] when neither signal is present and with
    /// [`Error::InvalidQueryContext`] when an explicit mode lacks its signal.
    pub fn resolve_mode(&self) -> Result<SearchMode> {
        let has_text = self.trimmed_text().is_some();
        let has_image = self.query_image.is_some();
        if !has_text && !has_image {
            return Err(Error::InvalidInput("query needs text, an image, or both".into()));
        }
        let mode = match self.mode {
            Some(mode) => mode,
            None if has_text && has_image => SearchMode::Hybrid,
            None if has_text => SearchMode::TextOnly,
            None => SearchMode::ImageOnly,
        };
        let satisfied = match mode {
            SearchMode::TextOnly => has_text,
            SearchMode::ImageOnly => has_image,
            SearchMode::Hybrid => has_text && has_image,
        };
        if !satisfied {
            return Err(Error::InvalidQueryContext(format!("{mode} mode is missing its query signal")));
        }
        Ok(mode)
    }
}

/// Per-request retrieval knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Candidates requested from the index; at least `top_k` so filtering has headroom.
    pub top_k_candidates: usize,
    pub namespace: String,
}

impl SearchOptions {
    /// Options for `top_k` (or the default) with `top_k * candidate_multiplier` candidates.
    pub fn from_settings(top_k: Option<usize>, settings: &SearchSettings) -> Result<Self> {
        let top_k = top_k.unwrap_or(settings.default_top_k);
        if top_k == 0 || top_k > settings.max_top_k {
            return Err(Error::InvalidInput(format!("top_k must be within 1..={}, got {top_k}", settings.max_top_k)));
        }
        Ok(Self {
            top_k,
            top_k_candidates: top_k.saturating_mul(settings.candidate_multiplier),
            namespace: settings.namespace.clone(),
        })
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_candidates(mut self, top_k_candidates: usize) -> Self {
        self.top_k_candidates = top_k_candidates;
        self
    }

    pub(crate) fn candidate_count(&self) -> usize { self.top_k_candidates.max(self.top_k) }
}
