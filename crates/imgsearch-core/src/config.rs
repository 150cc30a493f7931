//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_SEARCH__DEFAULT_TOP_K=12`).
//! Missing sections fall back to the defaults below.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::query::{validate_hybrid_weights, ScoringWeights};
use crate::types::Objective;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    fn section<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.contains(key) { self.get(key) } else { Ok(T::default()) }
    }

    pub fn search(&self) -> anyhow::Result<SearchSettings> { self.section("search") }

    pub fn index(&self) -> anyhow::Result<IndexSettings> { self.section("index") }

    pub fn embedding(&self) -> anyhow::Result<EmbeddingSettings> { self.section("embedding") }

    fn validate(&self) -> anyhow::Result<()> {
        self.search()?.validate()?;
        let index = self.index()?;
        index.validate()?;
        self.embedding()?.dim_for(&index)?;
        Ok(())
    }
}

/// Defaults applied to every search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Candidates fetched per requested result, leaving headroom for filtering.
    pub candidate_multiplier: usize,
    pub namespace: String,
    pub hybrid_text_weight: f32,
    pub weights: ScoringWeights,
    pub min_score: Option<f32>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: 8,
            max_top_k: 100,
            candidate_multiplier: 2,
            namespace: "default".to_string(),
            hybrid_text_weight: 0.5,
            weights: ScoringWeights::default(),
            min_score: None,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 || self.default_top_k > self.max_top_k {
            return Err(Error::InvalidConfig(format!(
                "search.default_top_k must be within 1..={}, got {}",
                self.max_top_k, self.default_top_k
            )));
        }
        if self.candidate_multiplier == 0 {
            return Err(Error::InvalidConfig("search.candidate_multiplier must be at least 1".into()));
        }
        if self.namespace.trim().is_empty() {
            return Err(Error::InvalidConfig("search.namespace must not be empty".into()));
        }
        validate_hybrid_weights(self.hybrid_text_weight, 1.0 - self.hybrid_text_weight)
            .map_err(|e| Error::InvalidConfig(format!("search.hybrid_text_weight: {e}")))?;
        if let Some(min) = self.min_score {
            if !(0.0..=1.0).contains(&min) {
                return Err(Error::InvalidConfig(format!("search.min_score must be within [0, 1], got {min}")));
            }
        }
        Ok(())
    }
}

/// Vector store location and provisioning inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub db_path: String,
    pub dimension: usize,
    pub expected_corpus_size: usize,
    pub objective: Objective,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            db_path: "data/lancedb".to_string(),
            dimension: 512,
            expected_corpus_size: 50_000,
            objective: Objective::Accuracy,
        }
    }
}

impl IndexSettings {
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidConfig("index.dimension must be positive".into()));
        }
        Ok(())
    }

    pub fn db_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.db_path) }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub use_fake: bool,
    /// Output dimension; defaults to `index.dimension` and must agree with it.
    pub dim: Option<usize>,
}

impl EmbeddingSettings {
    pub fn dim_for(&self, index: &IndexSettings) -> Result<usize> {
        match self.dim {
            Some(dim) if dim != index.dimension => Err(Error::InvalidConfig(format!(
                "embedding.dim ({dim}) differs from index.dimension ({})",
                index.dimension
            ))),
            _ => Ok(index.dimension),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
