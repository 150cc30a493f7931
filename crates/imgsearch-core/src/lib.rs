//! imgsearch-core
//!
//! Domain types, error taxonomy, collaborator traits and configuration shared
//! by the ranking, embedding, vector and search crates.

pub mod config;
pub mod error;
pub mod query;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorClass, Result};
pub use query::{QueryContext, ScoringWeights, SearchMode, WEIGHT_TOLERANCE};
pub use traits::{EmbeddingService, ImageInput, VectorIndex};
pub use types::{
    AttributeMap, AttributeValue, Candidate, CandidateColor, ColorBucket, Embedding, FilterCriteria,
    IndexFamily, IndexProfile, Objective, Orientation, Rgb, ScoredResult,
};
