//! Wiring of a LanceDB-backed orchestrator from loaded configuration.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use imgsearch_core::config::Config;
use imgsearch_embed::get_default_embedder;
use imgsearch_vector::{index_build, LanceVectorIndex};

use crate::orchestrator::SearchOrchestrator;

/// Opens the vector store under `base`, applies the query-time knobs of the
/// profile recorded for the default namespace and loads the embedder.
pub async fn open_lance(config: &Config, base: &Path) -> Result<SearchOrchestrator<LanceVectorIndex>> {
    let search = config.search()?;
    let index_settings = config.index()?;
    let embedding = config.embedding()?;
    let dim = embedding.dim_for(&index_settings)?;

    let db_path = index_settings.db_path(base);
    let mut index = LanceVectorIndex::open(&db_path, dim)
        .await
        .with_context(|| format!("opening vector store at {}", db_path.display()))?;
    if let Some(profile) = index_build::recorded_profile(index.connection(), &search.namespace).await? {
        info!(namespace = %search.namespace, index = %profile.index_name(), "using recorded index profile");
        index = index.with_profile(&profile);
    }
    let embedder = get_default_embedder(&embedding, dim)?;
    Ok(SearchOrchestrator::new(index, embedder, search))
}
