use imgsearch_core::types::attributes_from_json;
use imgsearch_core::{Candidate, Embedding, Error, ErrorClass, Objective, VectorIndex};
use imgsearch_vector::{index_build, select_profile, table, InMemoryIndex, LanceCandidateWriter, LanceVectorIndex};

const DIM: usize = 8;

fn basis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i % DIM] = 1.0;
    v[(i + 1) % DIM] = 0.25;
    v
}

fn fixtures(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| {
            Candidate::new(
                format!("img:{i:03}"),
                basis(i),
                attributes_from_json(&serde_json::json!({
                    "description": format!("photo {i}"),
                    "color": if i % 2 == 0 { "red" } else { "#0000ee" },
                    "width": 1600,
                    "height": 900,
                    "tags": ["test"],
                })),
            )
        })
        .collect()
}

#[tokio::test]
async fn upsert_then_query_round_trips_candidates() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let writer = LanceCandidateWriter::new(tmp.path(), "photos", DIM).await?;
    assert_eq!(writer.upsert(&fixtures(16)).await?, 16);

    let index = LanceVectorIndex::open(tmp.path(), DIM).await?;
    let hits = index.query(&Embedding::new(basis(3)), 4, "photos").await?;
    assert_eq!(hits.len(), 4);
    assert_eq!(hits[0].id, "img:003");
    assert_eq!(hits[0].embedding.as_slice(), basis(3).as_slice());
    assert_eq!(hits[0].attr_str("description"), Some("photo 3"));
    assert_eq!(hits[0].color_bucket(), Some(imgsearch_core::ColorBucket::Blue));

    // Upserting an existing id replaces it rather than duplicating.
    writer.upsert(&fixtures(2)).await?;
    let stats = index.describe_stats().await?;
    assert_eq!(stats.total_vectors, 16);
    assert_eq!(stats.namespaces.get("photos"), Some(&16));
    assert_eq!(stats.dimension, DIM);
    Ok(())
}

#[tokio::test]
async fn corpus_smaller_than_k_and_unknown_namespace() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    LanceCandidateWriter::new(tmp.path(), "small", DIM).await?.upsert(&fixtures(3)).await?;
    let index = LanceVectorIndex::open(tmp.path(), DIM).await?;
    assert_eq!(index.query(&Embedding::new(basis(0)), 10, "small").await?.len(), 3);
    assert!(index.query(&Embedding::new(basis(0)), 10, "absent").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn query_rejects_bad_namespace_and_dimension() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = LanceVectorIndex::open(tmp.path(), DIM).await?;
    let err = index.query(&Embedding::new(basis(0)), 5, "meta").await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::BadInput);
    let err = index.query(&Embedding::new(vec![1.0; 3]), 5, "photos").await.unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert_eq!(err.class(), ErrorClass::Internal);
    assert!(!err.is_retryable());
    Ok(())
}

#[tokio::test]
async fn writer_rejects_mismatched_embeddings() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let writer = LanceCandidateWriter::new(tmp.path(), "photos", DIM).await?;
    let bad = vec![Candidate::new("x", vec![1.0, 2.0], Default::default())];
    assert!(writer.upsert(&bad).await.is_err());
    Ok(())
}

#[tokio::test]
async fn meta_pointer_and_profile_round_trip() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let conn = table::open_db(&tmp.path().to_string_lossy()).await?;
    assert_eq!(index_build::active_index(&conn, "photos").await?, None);
    index_build::flip_active_index(&conn, "photos", "imgsearch-hnsw-d8-a").await?;
    index_build::flip_active_index(&conn, "photos", "imgsearch-hnsw-d8-b").await?;
    assert_eq!(index_build::active_index(&conn, "photos").await?.as_deref(), Some("imgsearch-hnsw-d8-b"));

    let profile = select_profile(5_000_000, Objective::Memory, DIM);
    index_build::record_profile(&conn, "photos", &profile).await?;
    assert_eq!(index_build::recorded_profile(&conn, "photos").await?, Some(profile));
    // The meta table is not a namespace.
    assert!(table::namespace_tables(&conn).await?.is_empty());
    Ok(())
}

#[test]
fn partitions_are_clamped_for_tiny_tables() {
    assert_eq!(index_build::effective_partitions(2048, 0), 1);
    assert_eq!(index_build::effective_partitions(2048, 300), 299);
    assert_eq!(index_build::effective_partitions(16, 300), 16);
}

/// Slow end-to-end test that trains and builds an index.
/// Ignored by default to keep CI fast; run explicitly when needed:
/// `cargo test -p imgsearch-vector --test lance_tests -- --ignored`
#[ignore]
#[tokio::test]
async fn build_validate_and_flip_index_slow() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let conn = table::open_db(&tmp.path().to_string_lossy()).await?;
    let writer = LanceCandidateWriter::from_connection(conn.clone(), "photos", DIM)?;
    writer.upsert(&fixtures(300)).await?;

    let profile = select_profile(300, Objective::Accuracy, DIM);
    let name = index_build::build_index(&conn, "photos", &profile).await?;
    assert!(name.starts_with("imgsearch-hnsw-d8-"));
    assert!(index_build::validate_index(&conn, "photos", 5, 5).await?);
    index_build::flip_active_index(&conn, "photos", &name).await?;
    assert_eq!(index_build::active_index(&conn, "photos").await?.as_deref(), Some(name.as_str()));

    let index = LanceVectorIndex::from_connection(conn, DIM).with_profile(&profile);
    assert!(!index.query(&Embedding::new(basis(7)), 5, "photos").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn in_memory_index_ranks_by_cosine() -> anyhow::Result<()> {
    let index = InMemoryIndex::new(DIM);
    index.upsert("photos", fixtures(8))?;
    let hits = index.query(&Embedding::new(basis(5)), 3, "photos").await?;
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id, "img:005");
    assert!(index.query(&Embedding::new(basis(5)), 3, "other").await?.is_empty());
    assert_eq!(index.stats()?.total_vectors, 8);

    let err = index.query(&Embedding::new(vec![1.0; DIM + 1]), 3, "photos").await.unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert_eq!(err.status_code(), 500);
    Ok(())
}

#[tokio::test]
async fn hnsw_ef_never_drops_below_k() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let conn = table::open_db(&tmp.path().to_string_lossy()).await?;
    let plain = LanceVectorIndex::from_connection(conn.clone(), DIM);
    assert_eq!(plain.query_ef(200), None);

    let hnsw = select_profile(5_000, Objective::Accuracy, DIM);
    let ef_search = hnsw.param_u32("ef_search").map(|v| v as usize).expect("hnsw ef_search");
    let index = LanceVectorIndex::from_connection(conn.clone(), DIM).with_profile(&hnsw);
    assert_eq!(index.query_ef(10), Some(ef_search));
    assert_eq!(index.query_ef(ef_search * 2), Some(ef_search * 2));

    let ivf = select_profile(5_000_000, Objective::Accuracy, DIM);
    assert_eq!(LanceVectorIndex::from_connection(conn, DIM).with_profile(&ivf).query_ef(500), None);
    Ok(())
}
