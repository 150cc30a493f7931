//! imgsearch-rank
//!
//! Per-request scoring: similarity primitives, query-vector construction,
//! weighted score fusion and the post-retrieval filter/sort pipeline. Every
//! function here is pure over its inputs.

pub mod filter;
pub mod fusion;
pub mod query_vector;
pub mod similarity;

pub use filter::{filter, matches, rank, sort};
pub use fusion::{fuse, fuse_with_report, Fused, SkippedCandidate};
pub use query_vector::{QueryVectorBuilder, QueryVectors};
pub use similarity::{color_similarity, cosine_similarity, l2_normalize};
