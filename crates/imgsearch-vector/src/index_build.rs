//! Build, validate and activate ANN indices from an [`IndexProfile`].
//!
//! Typical flow:
//! 1) Select a profile for the expected corpus (`strategy::select_profile`)
//! 2) Build the index on a namespace table under a unique name
//! 3) Validate on a tiny sample; flip the active index pointer in `meta`
use anyhow::Result;
use lancedb::{Connection, DistanceType};
use lancedb::index::Index;
use lancedb::index::vector::{IvfFlatIndexBuilder, IvfHnswSqIndexBuilder, IvfPqIndexBuilder};
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use arrow_array::{Array, FixedSizeListArray};
use arrow_array::cast::AsArray;
use tracing::{info, instrument};

use imgsearch_core::{IndexFamily, IndexProfile};
use crate::schema::VECTOR_COLUMN;
use crate::table::{get_meta, set_meta, META_TABLE};

pub async fn count_vectors(conn: &Connection, table: &str) -> Result<usize> {
    let tbl = conn.open_table(table).execute().await?;
    Ok(tbl.count_rows(None).await?)
}

/// Lance needs fewer partitions than rows to train; tiny tables get one.
pub fn effective_partitions(nlist: u32, rows: usize) -> u32 {
    let cap = u32::try_from(rows.saturating_sub(1)).unwrap_or(u32::MAX).max(1);
    nlist.clamp(1, cap)
}

/// Translates a profile into a Lance index definition:
/// HNSW → IVF_HNSW_SQ, IVF-Flat → IVF_FLAT, PQ → IVF_PQ, all with cosine distance.
pub fn lance_index_for(profile: &IndexProfile, rows: usize) -> Index {
    let partitions = |default: u32| effective_partitions(profile.param_u32("nlist").unwrap_or(default), rows);
    match profile.family {
        IndexFamily::Hnsw => {
            let mut builder = IvfHnswSqIndexBuilder::default().distance_type(DistanceType::Cosine).num_partitions(partitions(1));
            if let Some(m) = profile.param_u32("m") { builder = builder.num_edges(m); }
            if let Some(ef) = profile.param_u32("ef_construction") { builder = builder.ef_construction(ef); }
            Index::IvfHnswSq(builder)
        }
        IndexFamily::IvfFlat => Index::IvfFlat(
            IvfFlatIndexBuilder::default().distance_type(DistanceType::Cosine).num_partitions(partitions(2048)),
        ),
        IndexFamily::Pq => {
            let mut builder = IvfPqIndexBuilder::default().distance_type(DistanceType::Cosine).num_partitions(partitions(2048));
            if let Some(m) = profile.param_u32("m") { builder = builder.num_sub_vectors(m); }
            if let Some(bits) = profile.param_u32("nbits") { builder = builder.num_bits(bits); }
            Index::IvfPq(builder)
        }
    }
}

/// Builds the profile's index on `table` and returns its name
/// (`<profile name>-<UTC timestamp>`).
#[instrument(skip(conn, profile), fields(family = %profile.family))]
pub async fn build_index(conn: &Connection, table: &str, profile: &IndexProfile) -> Result<String> {
    let rows = count_vectors(conn, table).await?;
    let index_name = format!("{}-{}", profile.index_name(), chrono::Utc::now().format("%Y%m%d-%H%M%S"));
    let tbl = conn.open_table(table).execute().await?;
    tbl.create_index(&[VECTOR_COLUMN], lance_index_for(profile, rows))
        .name(index_name.clone())
        .replace(true)
        .execute()
        .await?;
    info!(%index_name, rows, "index built");
    Ok(index_name)
}

/// Very simple validation: sample up to `sample` vectors and ensure top-k returns non-empty.
pub async fn validate_index(conn: &Connection, table: &str, k: usize, sample: usize) -> Result<bool> {
    let tbl = conn.open_table(table).execute().await?;
    let mut stream = tbl.query().select(Select::columns(&[VECTOR_COLUMN])).limit(sample).execute().await?;
    let mut ok = 0usize;
    while let Some(batch) = futures::TryStreamExt::try_next(&mut stream).await? {
        let Some(fsl) = batch.column_by_name(VECTOR_COLUMN).and_then(|a| a.as_any().downcast_ref::<FixedSizeListArray>()) else { continue };
        for i in 0..batch.num_rows() {
            if !fsl.is_valid(i) { continue; }
            let inner = fsl.value(i);
            let q = inner.as_primitive::<arrow_array::types::Float32Type>().values().to_vec();
            let mut s = tbl.vector_search(q)?.distance_type(DistanceType::Cosine).limit(k).execute().await?;
            if let Some(rb) = futures::TryStreamExt::try_next(&mut s).await? {
                if rb.num_rows() > 0 { ok += 1; }
            }
        }
    }
    Ok(ok > 0)
}

fn active_key(table: &str) -> String { format!("active_index_id:{table}") }

/// Flip active index pointer in the meta table (keyed by namespace table name)
pub async fn flip_active_index(conn: &Connection, table: &str, index_id: &str) -> Result<()> {
    set_meta(conn, META_TABLE, &active_key(table), index_id).await
}

pub async fn active_index(conn: &Connection, table: &str) -> Result<Option<String>> {
    get_meta(conn, META_TABLE, &active_key(table)).await
}

/// Stores the profile JSON next to the active index pointer.
pub async fn record_profile(conn: &Connection, table: &str, profile: &IndexProfile) -> Result<()> {
    set_meta(conn, META_TABLE, &format!("profile:{table}"), &serde_json::to_string(profile)?).await
}

pub async fn recorded_profile(conn: &Connection, table: &str) -> Result<Option<IndexProfile>> {
    match get_meta(conn, META_TABLE, &format!("profile:{table}")).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}
