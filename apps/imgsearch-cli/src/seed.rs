//! Seed files: a JSON array or JSON lines of records shaped like
//! `{"id": "...", "vector": [..]?, "description": "...", ...attributes}`.
//! Records without a vector are embedded from their description.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use imgsearch_core::types::attributes_from_json;
use imgsearch_core::{Candidate, EmbeddingService};

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRecord {
    pub id: String,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl SeedRecord {
    pub fn description(&self) -> Option<&str> { self.attributes.get("description").and_then(|v| v.as_str()) }
}

pub fn parse_records(content: &str) -> Result<Vec<SeedRecord>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("parsing seed JSON array");
    }
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| serde_json::from_str(line).with_context(|| format!("parsing seed line {}", n + 1)))
        .collect()
}

pub fn load_records(path: &Path) -> Result<Vec<SeedRecord>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_records(&content)
}

/// Turns records into candidates, embedding descriptions where no vector is given.
pub async fn to_candidates(records: Vec<SeedRecord>, embedder: &dyn EmbeddingService) -> Result<Vec<Candidate>> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let vector = match record.vector.clone() {
            Some(v) => v,
            None => {
                let text = record
                    .description()
                    .ok_or_else(|| anyhow!("record '{}' has neither a vector nor a description", record.id))?;
                embedder.embed_text(text).await?.into_inner()
            }
        };
        if vector.len() != embedder.dim() {
            bail!("record '{}' has a {}-d vector, expected {}", record.id, vector.len(), embedder.dim());
        }
        let metadata = attributes_from_json(&serde_json::Value::Object(record.attributes));
        out.push(Candidate::new(record.id, vector, metadata));
    }
    Ok(out)
}
