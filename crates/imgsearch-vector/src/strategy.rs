//! Index profile selection for provisioning.
//!
//! Best-effort heuristic over four corpus-size bands:
//!
//! | corpus size        | accuracy        | speed    | memory          |
//! |--------------------|-----------------|----------|-----------------|
//! | `< 10k`            | HNSW (high)     | HNSW (high) | HNSW (high)  |
//! | `10k..100k`        | HNSW (high)     | IVF-Flat | HNSW (balanced) |
//! | `100k..1M`         | HNSW (m=24)     | IVF-Flat | PQ              |
//! | `>= 1M`            | IVF-Flat        | PQ       | PQ              |
//!
//! Thresholds are tuning knobs, not a contract. Every input yields a profile.

use std::collections::BTreeMap;

use imgsearch_core::{IndexFamily, IndexProfile, Objective};

pub const SMALL_CORPUS: usize = 10_000;
pub const MEDIUM_CORPUS: usize = 100_000;
pub const LARGE_CORPUS: usize = 1_000_000;

pub const PQ_NBITS: u32 = 8;

/// Chooses an [`IndexProfile`] for a corpus of `corpus_size` vectors of `dimension`.
pub fn select_profile(corpus_size: usize, objective: Objective, dimension: usize) -> IndexProfile {
    match (corpus_size, objective) {
        (n, _) if n < SMALL_CORPUS => hnsw(dimension, 32, 400, 64, 100),
        (n, Objective::Accuracy) if n < MEDIUM_CORPUS => hnsw(dimension, 32, 400, 64, 100),
        (n, Objective::Memory) if n < MEDIUM_CORPUS => hnsw(dimension, 16, 200, 32, 50),
        (n, Objective::Accuracy) if n < LARGE_CORPUS => hnsw(dimension, 24, 300, 64, 100),
        (n, Objective::Memory) if n < LARGE_CORPUS => pq(corpus_size, dimension),
        (n, Objective::Speed) if n < LARGE_CORPUS => ivf_flat(corpus_size, dimension, 5),
        // >= 1M: IVF-Flat keeps exact distances inside probed lists.
        (_, Objective::Accuracy) => ivf_flat(corpus_size, dimension, 20),
        (_, Objective::Speed | Objective::Memory) => pq(corpus_size, dimension),
    }
}

/// IVF list count: `max(2048, 2 * sqrt(n))`, capped at 65536.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn ivf_nlist(corpus_size: usize) -> usize {
    let sqrt_n = (corpus_size as f64).sqrt() as usize;
    std::cmp::max(2048, 2 * sqrt_n).min(65_536)
}

/// PQ sub-vector count: about `dimension / 32` within `[4, 64]`, adjusted down
/// to a divisor of `dimension` so every sub-vector has equal width.
pub fn pq_sub_vectors(dimension: usize) -> usize {
    if dimension == 0 {
        return 1;
    }
    let target = (dimension / 32).clamp(4, 64).min(dimension);
    (1..=target).rev().find(|m| dimension % m == 0).unwrap_or(1)
}

fn hnsw(dimension: usize, m: u32, ef_construction: u32, max_connections: u32, ef_search: u32) -> IndexProfile {
    let mut params = BTreeMap::new();
    params.insert("m".to_string(), f64::from(m));
    params.insert("ef_construction".to_string(), f64::from(ef_construction));
    params.insert("max_connections".to_string(), f64::from(max_connections));
    params.insert("ef_search".to_string(), f64::from(ef_search));
    IndexProfile { family: IndexFamily::Hnsw, dimension, build_params: params }
}

#[allow(clippy::cast_precision_loss)]
fn ivf_flat(corpus_size: usize, dimension: usize, nprobe: u32) -> IndexProfile {
    let mut params = BTreeMap::new();
    params.insert("nlist".to_string(), ivf_nlist(corpus_size) as f64);
    params.insert("nprobe".to_string(), f64::from(nprobe));
    IndexProfile { family: IndexFamily::IvfFlat, dimension, build_params: params }
}

#[allow(clippy::cast_precision_loss)]
fn pq(corpus_size: usize, dimension: usize) -> IndexProfile {
    let mut params = BTreeMap::new();
    params.insert("nlist".to_string(), ivf_nlist(corpus_size) as f64);
    params.insert("nprobe".to_string(), 10.0);
    params.insert("m".to_string(), pq_sub_vectors(dimension) as f64);
    params.insert("nbits".to_string(), f64::from(PQ_NBITS));
    IndexProfile { family: IndexFamily::Pq, dimension, build_params: params }
}
