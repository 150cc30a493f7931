//! imgsearch-search
//!
//! Request handling on top of the ranking crate: validates loosely shaped
//! input into a query context, retrieves candidates with headroom, fuses and
//! filters scores, and reports the effective query alongside the results.

pub mod bootstrap;
pub mod orchestrator;
pub mod request;
pub mod response;

pub use orchestrator::SearchOrchestrator;
pub use request::{RawQueryInput, SearchOptions};
pub use response::{ComponentScores, EffectiveQuery, RankedResult, RankedSearchResponse};
