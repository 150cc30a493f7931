//! Domain types used by the ranking, vector and search crates.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A fixed-length embedding produced by the embedding service.
///
/// Text and image embeddings share this type; they are only comparable when
/// they come from the same embedding space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self { Self(values) }

    pub fn dim(&self) -> usize { self.0.len() }

    pub fn as_slice(&self) -> &[f32] { &self.0 }

    pub fn into_inner(self) -> Vec<f32> { self.0 }

    pub fn norm(&self) -> f32 { self.0.iter().map(|x| x * x).sum::<f32>().sqrt() }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self { Self(values) }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] { &self.0 }
}

/// A single metadata value attached to a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// Converts a JSON value, dropping nulls, objects and mixed arrays.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(AttributeValue::Number),
            serde_json::Value::String(s) => Some(AttributeValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(AttributeValue::Text(b.to_string())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(AttributeValue::List),
            serde_json::Value::Null | serde_json::Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(s) => s.trim().parse().ok(),
            AttributeValue::List(_) => None,
        }
    }
}

pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// Builds an [`AttributeMap`] from a JSON object; non-objects yield an empty map.
pub fn attributes_from_json(value: &serde_json::Value) -> AttributeMap {
    value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| AttributeValue::from_json(v).map(|v| (k.clone(), v)))
                .collect()
        })
        .unwrap_or_default()
}

/// One entry returned by the vector index.
///
/// Well-known metadata keys: `description`, `color`, `orientation`, `width`,
/// `height`, `created_at`, `source`, `photographer`, `tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub embedding: Embedding,
    #[serde(default)]
    pub metadata: AttributeMap,
}

impl Candidate {
    pub fn new(id: impl Into<String>, embedding: impl Into<Embedding>, metadata: AttributeMap) -> Self {
        Self { id: id.into(), embedding: embedding.into(), metadata }
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> { self.metadata.get(key).and_then(AttributeValue::as_str) }

    pub fn attr_f64(&self, key: &str) -> Option<f64> { self.metadata.get(key).and_then(AttributeValue::as_f64) }

    /// The `color` attribute, either a bucket name or a `#rrggbb` hex colour.
    pub fn color(&self) -> Option<CandidateColor> { self.attr_str("color").and_then(|s| s.parse().ok()) }

    /// The colour bucket of this candidate; hex colours resolve to the nearest bucket.
    pub fn color_bucket(&self) -> Option<ColorBucket> { self.color().map(|c| c.bucket()) }

    /// Explicit `orientation`, falling back to `width`/`height`.
    pub fn orientation(&self) -> Option<Orientation> {
        if let Some(o) = self.attr_str("orientation").and_then(|s| s.parse().ok()) {
            return Some(o);
        }
        match (self.attr_f64("width"), self.attr_f64("height")) {
            (Some(w), Some(h)) => Orientation::from_dimensions(w, h),
            _ => None,
        }
    }

    /// Calendar date of `created_at`, if present and parseable.
    pub fn created_on(&self) -> Option<NaiveDate> { self.attr_str("created_at").and_then(parse_date) }
}

/// Parses RFC 3339 timestamps, naive ISO timestamps or plain `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self { Self { r, g, b } }

    /// Parses `#rrggbb` (leading `#` optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn distance(&self, other: &Rgb) -> f32 {
        let d = |a: u8, b: u8| {
            let x = f32::from(a) - f32::from(b);
            x * x
        };
        (d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b)).sqrt()
    }

    /// Largest possible distance between two RGB colours.
    pub fn max_distance() -> f32 { (3.0f32 * 255.0 * 255.0).sqrt() }
}

/// Colour buckets offered by the image source's colour filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBucket {
    BlackAndWhite,
    Black,
    White,
    Yellow,
    Orange,
    Red,
    Purple,
    Magenta,
    Green,
    Teal,
    Blue,
}

impl ColorBucket {
    pub const ALL: [ColorBucket; 11] = [
        ColorBucket::BlackAndWhite,
        ColorBucket::Black,
        ColorBucket::White,
        ColorBucket::Yellow,
        ColorBucket::Orange,
        ColorBucket::Red,
        ColorBucket::Purple,
        ColorBucket::Magenta,
        ColorBucket::Green,
        ColorBucket::Teal,
        ColorBucket::Blue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorBucket::BlackAndWhite => "black_and_white",
            ColorBucket::Black => "black",
            ColorBucket::White => "white",
            ColorBucket::Yellow => "yellow",
            ColorBucket::Orange => "orange",
            ColorBucket::Red => "red",
            ColorBucket::Purple => "purple",
            ColorBucket::Magenta => "magenta",
            ColorBucket::Green => "green",
            ColorBucket::Teal => "teal",
            ColorBucket::Blue => "blue",
        }
    }

    /// Representative RGB value; black-and-white is mid grey.
    pub fn reference_rgb(&self) -> Rgb {
        match self {
            ColorBucket::BlackAndWhite => Rgb::new(128, 128, 128),
            ColorBucket::Black => Rgb::new(0, 0, 0),
            ColorBucket::White => Rgb::new(255, 255, 255),
            ColorBucket::Yellow => Rgb::new(255, 255, 0),
            ColorBucket::Orange => Rgb::new(255, 165, 0),
            ColorBucket::Red => Rgb::new(255, 0, 0),
            ColorBucket::Purple => Rgb::new(128, 0, 128),
            ColorBucket::Magenta => Rgb::new(255, 0, 255),
            ColorBucket::Green => Rgb::new(0, 255, 0),
            ColorBucket::Teal => Rgb::new(0, 128, 128),
            ColorBucket::Blue => Rgb::new(0, 0, 255),
        }
    }

    /// Bucket whose reference colour is closest; ties go to the earlier bucket in [`ColorBucket::ALL`].
    pub fn nearest(rgb: &Rgb) -> ColorBucket {
        let mut best = ColorBucket::ALL[0];
        let mut best_d = f32::INFINITY;
        for bucket in ColorBucket::ALL {
            let d = rgb.distance(&bucket.reference_rgb());
            if d < best_d {
                best = bucket;
                best_d = d;
            }
        }
        best
    }
}

impl fmt::Display for ColorBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ColorBucket {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let norm = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ColorBucket::ALL
            .into_iter()
            .find(|b| b.as_str() == norm)
            .ok_or_else(|| Error::InvalidInput(format!("unknown color bucket '{s}'")))
    }
}

/// Colour attribute of a candidate as stored by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateColor {
    Bucket(ColorBucket),
    Rgb(Rgb),
}

impl CandidateColor {
    pub fn bucket(&self) -> ColorBucket {
        match self {
            CandidateColor::Bucket(b) => *b,
            CandidateColor::Rgb(rgb) => ColorBucket::nearest(rgb),
        }
    }

    pub fn rgb(&self) -> Rgb {
        match self {
            CandidateColor::Bucket(b) => b.reference_rgb(),
            CandidateColor::Rgb(rgb) => *rgb,
        }
    }
}

impl FromStr for CandidateColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim_start().starts_with('#') {
            return Rgb::from_hex(s)
                .map(CandidateColor::Rgb)
                .ok_or_else(|| Error::InvalidInput(format!("malformed hex color '{s}'")));
        }
        s.parse().map(CandidateColor::Bucket)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Landscape,
    Portrait,
    Squarish,
}

impl Orientation {
    pub const LANDSCAPE_MIN_ASPECT: f64 = 1.2;
    pub const PORTRAIT_MAX_ASPECT: f64 = 0.8;

    /// Classifies by aspect ratio `width / height`.
    pub fn from_dimensions(width: f64, height: f64) -> Option<Self> {
        if !(width > 0.0 && height > 0.0) {
            return None;
        }
        let aspect = width / height;
        Some(if aspect > Self::LANDSCAPE_MIN_ASPECT {
            Orientation::Landscape
        } else if aspect < Self::PORTRAIT_MAX_ASPECT {
            Orientation::Portrait
        } else {
            Orientation::Squarish
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Squarish => "squarish",
        }
    }
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landscape" => Ok(Orientation::Landscape),
            "portrait" => Ok(Orientation::Portrait),
            "squarish" | "square" => Ok(Orientation::Squarish),
            other => Err(Error::InvalidInput(format!("unknown orientation '{other}'"))),
        }
    }
}

/// A candidate with its per-signal scores and the fused score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub candidate: Candidate,
    pub image_score: f32,
    pub text_score: f32,
    pub metadata_score: f32,
    /// Weighted sum of the component scores, clamped to `[0, 1]`.
    pub final_score: f32,
}

/// Post-retrieval constraints. Absent fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub min_score: Option<f32>,
    #[serde(default)]
    pub color: Option<ColorBucket>,
    #[serde(default)]
    pub orientation: Option<Orientation>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.min_score.is_none()
            && self.color.is_none()
            && self.orientation.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(min) = self.min_score {
            if !(0.0..=1.0).contains(&min) {
                return Err(Error::InvalidInput(format!("min_score must be within [0, 1], got {min}")));
            }
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(Error::InvalidInput(format!("date_from {from} is after date_to {to}")));
            }
        }
        Ok(())
    }
}

/// ANN algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFamily {
    Hnsw,
    IvfFlat,
    Pq,
}

impl IndexFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexFamily::Hnsw => "hnsw",
            IndexFamily::IvfFlat => "ivf_flat",
            IndexFamily::Pq => "pq",
        }
    }
}

impl fmt::Display for IndexFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// What an index profile optimises for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Accuracy,
    Speed,
    Memory,
}

impl FromStr for Objective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accuracy" => Ok(Objective::Accuracy),
            "speed" => Ok(Objective::Speed),
            "memory" => Ok(Objective::Memory),
            other => Err(Error::InvalidInput(format!("unknown index objective '{other}'"))),
        }
    }
}

/// Index configuration chosen at provisioning time. Never mutated; a new
/// profile replaces the old one on reconfiguration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexProfile {
    pub family: IndexFamily,
    pub dimension: usize,
    pub build_params: BTreeMap<String, f64>,
}

impl IndexProfile {
    pub fn param(&self, key: &str) -> Option<f64> { self.build_params.get(key).copied() }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn param_u32(&self, key: &str) -> Option<u32> {
        self.param(key).filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u32)
    }

    /// Stable index name, e.g. `imgsearch-hnsw-d512`.
    pub fn index_name(&self) -> String { format!("imgsearch-{}-d{}", self.family, self.dimension) }
}
