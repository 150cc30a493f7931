use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use imgsearch_core::config::SearchSettings;
use imgsearch_core::{
    Embedding, EmbeddingService, Error, FilterCriteria, QueryContext, Result, SearchMode,
    VectorIndex,
};
use imgsearch_rank::{fuse_with_report, rank, QueryVectorBuilder};

use crate::request::{RawQueryInput, SearchOptions};
use crate::response::{EffectiveQuery, RankedResult, RankedSearchResponse};

/// Runs one search request end to end:
/// input → query context → query vectors → index → fusion → filter/sort → top-k.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct SearchOrchestrator<VI> where VI: VectorIndex {
    index: VI,
    embedder: Box<dyn EmbeddingService>,
    settings: SearchSettings,
}

impl<VI> SearchOrchestrator<VI> where VI: VectorIndex {
    pub fn new(index: VI, embedder: Box<dyn EmbeddingService>, settings: SearchSettings) -> Self {
        Self { index, embedder, settings }
    }

    pub fn settings(&self) -> &SearchSettings { &self.settings }

    pub fn index(&self) -> &VI { &self.index }

    /// Options derived from the request's `top_k` and the search settings.
    pub fn options_for(&self, input: &RawQueryInput) -> Result<SearchOptions> {
        SearchOptions::from_settings(input.top_k, &self.settings)
    }

    /// Executes `input`. Only the embedding and index calls observe `cancel`;
    /// once scoring starts the request runs to completion.
    ///
    /// Input problems surface as bad-input errors, embedding and index
    /// failures as unavailable errors. Nothing is retried here.
    #[instrument(skip_all, fields(namespace = %options.namespace, top_k = options.top_k))]
    pub async fn search(
        &self,
        input: RawQueryInput,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<RankedSearchResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let start = Instant::now();
        let mode = input.resolve_mode()?;
        let weights = input.weights.unwrap_or(self.settings.weights);
        let filters = self.effective_filters(&input);
        filters.validate()?;
        let text_weight = input.hybrid_text_weight.unwrap_or(self.settings.hybrid_text_weight);

        let ctx = self.query_context(&input, mode, text_weight, cancel).await?;
        let vectors = QueryVectorBuilder::build(&ctx)?;
        let k = options.candidate_count();
        let candidates = guarded(cancel, self.index.query(&vectors.search, k, &options.namespace)).await?;
        let retrieved = candidates.len();
        debug!(%mode, k, retrieved, "candidates retrieved");

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let fused = fuse_with_report(candidates, &ctx, &weights, input.target_color)?;
        let ranked = rank(fused.results, &filters, options.top_k);
        let results: Vec<RankedResult> = ranked.into_iter().map(RankedResult::from).collect();
        info!(
            %mode,
            retrieved,
            returned = results.len(),
            skipped = fused.skipped.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search complete"
        );

        let effective_query = EffectiveQuery {
            mode,
            query_text: input.trimmed_text().map(str::to_string),
            has_image: input.query_image.is_some(),
            hybrid_text_weight: (mode == SearchMode::Hybrid).then_some(text_weight),
            weights: fused.weights,
            target_color: input.target_color,
            filters,
            top_k: options.top_k,
            top_k_candidates: k,
            namespace: options.namespace.clone(),
            candidates_retrieved: retrieved,
        };
        Ok(RankedSearchResponse {
            count: results.len(),
            results,
            effective_query,
            skipped: fused.skipped.into_iter().map(|s| s.id).collect(),
        })
    }

    /// Like [`search`](Self::search) with options from the request and no cancellation.
    pub async fn search_default(&self, input: RawQueryInput) -> Result<RankedSearchResponse> {
        let options = self.options_for(&input)?;
        self.search(input, &options, &CancellationToken::new()).await
    }

    fn effective_filters(&self, input: &RawQueryInput) -> FilterCriteria {
        let mut filters = input.filters.clone();
        if filters.min_score.is_none() {
            filters.min_score = self.settings.min_score;
        }
        filters
    }

    async fn query_context(
        &self,
        input: &RawQueryInput,
        mode: SearchMode,
        text_weight: f32,
        cancel: &CancellationToken,
    ) -> Result<QueryContext> {
        match mode {
            SearchMode::TextOnly => Ok(QueryContext::text_only(self.embed_text(input, cancel).await?)),
            SearchMode::ImageOnly => Ok(QueryContext::image_only(self.embed_image(input, cancel).await?)),
            SearchMode::Hybrid => {
                let (text, image) = tokio::try_join!(self.embed_text(input, cancel), self.embed_image(input, cancel))?;
                QueryContext::hybrid(text, image, text_weight, 1.0 - text_weight)
            }
        }
    }

    async fn embed_text(&self, input: &RawQueryInput, cancel: &CancellationToken) -> Result<Embedding> {
        let text = input.trimmed_text().ok_or_else(|| Error::InvalidQueryContext("query text is missing".into()))?;
        guarded(cancel, self.embedder.embed_text(text)).await
    }

    async fn embed_image(&self, input: &RawQueryInput, cancel: &CancellationToken) -> Result<Embedding> {
        let image = input.query_image.as_ref().ok_or_else(|| Error::InvalidQueryContext("query image is missing".into()))?;
        guarded(cancel, self.embedder.embed_image(image)).await
    }
}

/// Races `call` against cancellation; a cancelled token wins ties.
async fn guarded<T>(cancel: &CancellationToken, call: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        out = call => out,
    }
}

