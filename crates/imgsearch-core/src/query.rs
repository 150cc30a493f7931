//! Query modes, the validated query context and scoring weights.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::Embedding;

/// Tolerance used for every "weights sum to 1" check.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMode {
    #[serde(rename = "text", alias = "text_only")]
    TextOnly,
    #[serde(rename = "image", alias = "image_only")]
    ImageOnly,
    #[serde(rename = "hybrid")]
    Hybrid,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::TextOnly => "text",
            SearchMode::ImageOnly => "image",
            SearchMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "text_only" => Ok(SearchMode::TextOnly),
            "image" | "image_only" => Ok(SearchMode::ImageOnly),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(Error::InvalidInput(format!("unknown search mode '{other}'"))),
        }
    }
}

/// Per-request query state. Each variant carries exactly the embeddings its
/// mode needs, so a missing embedding cannot reach the scorer.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryContext {
    TextOnly { text: Embedding },
    ImageOnly { image: Embedding },
    Hybrid { text: Embedding, image: Embedding, text_weight: f32, image_weight: f32 },
}

impl QueryContext {
    /// Validates loosely-shaped parts into a context.
    ///
    /// Fails with [`Error::InvalidQueryContext`] when the embedding(s) the
    /// mode requires are absent or the hybrid weights are invalid. Hybrid
    /// weights are ignored by the single-modality modes.
    pub fn new(
        mode: SearchMode,
        text: Option<Embedding>,
        image: Option<Embedding>,
        hybrid_text_weight: f32,
        hybrid_image_weight: f32,
    ) -> Result<Self> {
        match mode {
            SearchMode::TextOnly => text
                .map(|text| QueryContext::TextOnly { text })
                .ok_or_else(|| Error::InvalidQueryContext("text mode requires a text embedding".into())),
            SearchMode::ImageOnly => image
                .map(|image| QueryContext::ImageOnly { image })
                .ok_or_else(|| Error::InvalidQueryContext("image mode requires an image embedding".into())),
            SearchMode::Hybrid => match (text, image) {
                (Some(text), Some(image)) => Self::hybrid(text, image, hybrid_text_weight, hybrid_image_weight),
                _ => Err(Error::InvalidQueryContext("hybrid mode requires both text and image embeddings".into())),
            },
        }
    }

    pub fn text_only(text: Embedding) -> Self { QueryContext::TextOnly { text } }

    pub fn image_only(image: Embedding) -> Self { QueryContext::ImageOnly { image } }

    pub fn hybrid(text: Embedding, image: Embedding, text_weight: f32, image_weight: f32) -> Result<Self> {
        validate_hybrid_weights(text_weight, image_weight)?;
        Ok(QueryContext::Hybrid { text, image, text_weight, image_weight })
    }

    pub fn mode(&self) -> SearchMode {
        match self {
            QueryContext::TextOnly { .. } => SearchMode::TextOnly,
            QueryContext::ImageOnly { .. } => SearchMode::ImageOnly,
            QueryContext::Hybrid { .. } => SearchMode::Hybrid,
        }
    }

    pub fn text_embedding(&self) -> Option<&Embedding> {
        match self {
            QueryContext::TextOnly { text } | QueryContext::Hybrid { text, .. } => Some(text),
            QueryContext::ImageOnly { .. } => None,
        }
    }

    pub fn image_embedding(&self) -> Option<&Embedding> {
        match self {
            QueryContext::ImageOnly { image } | QueryContext::Hybrid { image, .. } => Some(image),
            QueryContext::TextOnly { .. } => None,
        }
    }
}

/// Hybrid blend weights must be finite, non-negative and sum to 1.
pub fn validate_hybrid_weights(text_weight: f32, image_weight: f32) -> Result<()> {
    if !text_weight.is_finite() || !image_weight.is_finite() || text_weight < 0.0 || image_weight < 0.0 {
        return Err(Error::InvalidQueryContext(format!(
            "hybrid weights must be finite and non-negative (text={text_weight}, image={image_weight})"
        )));
    }
    let sum = f64::from(text_weight) + f64::from(image_weight);
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(Error::InvalidQueryContext(format!("hybrid weights must sum to 1.0, got {sum}")));
    }
    Ok(())
}

// Omitted fields take the default weights so a config can override just one.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
struct RawWeights {
    image_weight: f32,
    text_weight: f32,
    metadata_weight: f32,
}

impl Default for RawWeights {
    fn default() -> Self {
        let d = ScoringWeights::default();
        Self { image_weight: d.image_weight, text_weight: d.text_weight, metadata_weight: d.metadata_weight }
    }
}

/// Fusion weights for the image, text and metadata signals.
///
/// Each input must lie in [0, 1]. The result always sums to 1.0 within
/// [`WEIGHT_TOLERANCE`]: inputs that do not are divided by their sum. A zero
/// sum is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct ScoringWeights {
    image_weight: f32,
    text_weight: f32,
    metadata_weight: f32,
}

impl ScoringWeights {
    pub fn new(image_weight: f32, text_weight: f32, metadata_weight: f32) -> Result<Self> {
        for (name, w) in [("image", image_weight), ("text", text_weight), ("metadata", metadata_weight)] {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(Error::InvalidWeights(format!("{name} weight must be within [0, 1], got {w}")));
            }
        }
        let sum = f64::from(image_weight) + f64::from(text_weight) + f64::from(metadata_weight);
        if sum <= 0.0 {
            return Err(Error::InvalidWeights("weights sum to zero".into()));
        }
        if (sum - 1.0).abs() <= WEIGHT_TOLERANCE {
            return Ok(Self { image_weight, text_weight, metadata_weight });
        }
        #[allow(clippy::cast_possible_truncation)]
        let scale = |w: f32| (f64::from(w) / sum) as f32;
        Ok(Self {
            image_weight: scale(image_weight),
            text_weight: scale(text_weight),
            metadata_weight: scale(metadata_weight),
        })
    }

    pub fn image_weight(&self) -> f32 { self.image_weight }

    pub fn text_weight(&self) -> f32 { self.text_weight }

    pub fn metadata_weight(&self) -> f32 { self.metadata_weight }

    pub fn sum(&self) -> f64 {
        f64::from(self.image_weight) + f64::from(self.text_weight) + f64::from(self.metadata_weight)
    }

    /// Weights restricted to the signals present in a request.
    ///
    /// Absent signals get weight 0 and the rest are renormalised to sum to 1.
    /// Fails with [`Error::InvalidWeights`] when every present signal has zero weight.
    pub fn redistribute(&self, has_image: bool, has_text: bool, has_metadata: bool) -> Result<Self> {
        let keep = |present: bool, w: f32| if present { w } else { 0.0 };
        Self::new(
            keep(has_image, self.image_weight),
            keep(has_text, self.text_weight),
            keep(has_metadata, self.metadata_weight),
        )
        .map_err(|_| {
            Error::InvalidWeights(format!(
                "no weight left for the signals present in this query (image={has_image}, text={has_text}, metadata={has_metadata})"
            ))
        })
    }
}

impl Default for ScoringWeights {
    fn default() -> Self { Self { image_weight: 0.6, text_weight: 0.2, metadata_weight: 0.2 } }
}

impl TryFrom<RawWeights> for ScoringWeights {
    type Error = Error;

    fn try_from(raw: RawWeights) -> Result<Self> { Self::new(raw.image_weight, raw.text_weight, raw.metadata_weight) }
}
