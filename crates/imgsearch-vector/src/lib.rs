//! imgsearch-vector
//!
//! Vector index side of image search: index profile selection at provisioning
//! time, a LanceDB-backed [`VectorIndex`](imgsearch_core::VectorIndex) with
//! one table per namespace, index build/validate/flip helpers and an exact
//! in-memory index.

pub mod index_build;
pub mod memory;
pub mod schema;
pub mod search;
pub mod strategy;
pub mod table;
pub mod writer;

pub use memory::InMemoryIndex;
pub use search::{IndexStats, LanceVectorIndex};
pub use strategy::select_profile;
pub use writer::LanceCandidateWriter;
