//! Query-vector construction for the three query modes.
//!
//! TextOnly and ImageOnly pass their embedding through unchanged. Hybrid
//! blends `text_weight * text + image_weight * image` and rescales the blend
//! to unit length so cosine similarity against the index stays well defined.

use imgsearch_core::query::validate_hybrid_weights;
use imgsearch_core::{Embedding, Error, QueryContext, Result, SearchMode};

use crate::similarity::l2_normalize;

/// Vectors derived from one [`QueryContext`].
///
/// `search` goes to the nearest-neighbour index; `text` and `image` are the
/// per-signal vectors used by score fusion (absent when the query lacks that signal).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVectors {
    pub mode: SearchMode,
    pub search: Embedding,
    pub text: Option<Embedding>,
    pub image: Option<Embedding>,
}

pub struct QueryVectorBuilder;

impl QueryVectorBuilder {
    pub fn build(ctx: &QueryContext) -> Result<QueryVectors> {
        match ctx {
            QueryContext::TextOnly { text } => Ok(QueryVectors {
                mode: SearchMode::TextOnly,
                search: text.clone(),
                text: Some(text.clone()),
                image: None,
            }),
            QueryContext::ImageOnly { image } => Ok(QueryVectors {
                mode: SearchMode::ImageOnly,
                search: image.clone(),
                text: None,
                image: Some(image.clone()),
            }),
            QueryContext::Hybrid { text, image, text_weight, image_weight } => {
                validate_hybrid_weights(*text_weight, *image_weight)?;
                let blended = blend(text, image, *text_weight, *image_weight)?;
                Ok(QueryVectors {
                    mode: SearchMode::Hybrid,
                    search: blended,
                    text: Some(text.clone()),
                    image: Some(image.clone()),
                })
            }
        }
    }
}

fn blend(text: &Embedding, image: &Embedding, text_weight: f32, image_weight: f32) -> Result<Embedding> {
    if text.dim() != image.dim() {
        return Err(Error::InvalidQueryContext(format!(
            "text and image embeddings differ in dimension ({} vs {})",
            text.dim(),
            image.dim()
        )));
    }
    let raw: Vec<f32> = text
        .as_slice()
        .iter()
        .zip(image.as_slice())
        .map(|(t, i)| text_weight * t + image_weight * i)
        .collect();
    l2_normalize(&raw)
        .map(Embedding::new)
        .map_err(|_| Error::InvalidQueryContext("blended hybrid vector has zero norm".into()))
}
