use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{connect, Connection, DistanceType};
use lancedb::query::{QueryBase, ExecutableQuery, Select};
use arrow_array::{Array, FixedSizeListArray, RecordBatch, StringArray};
use arrow_array::cast::AsArray;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use imgsearch_core::types::attributes_from_json;
use imgsearch_core::{Candidate, Embedding, Error, IndexFamily, IndexProfile, VectorIndex};
use crate::schema::{ID_COLUMN, METADATA_COLUMN, VECTOR_COLUMN};
use crate::table::{namespace_tables, table_exists, validate_namespace};

/// Vector count per namespace plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
	pub dimension: usize,
	pub namespaces: BTreeMap<String, usize>,
	pub total_vectors: usize,
}

/// LanceDB-backed [`VectorIndex`]. Each namespace is a table; distances are cosine.
pub struct LanceVectorIndex { pub(crate) db: Connection, dimension: usize, nprobes: Option<usize>, ef: Option<usize> }

impl LanceVectorIndex {
	pub async fn open(db_path: &Path, dimension: usize) -> Result<Self> {
		let db = connect(db_path.to_string_lossy().as_ref()).execute().await?;
		Ok(Self::from_connection(db, dimension))
	}

	pub fn from_connection(db: Connection, dimension: usize) -> Self { Self { db, dimension, nprobes: None, ef: None } }

	/// Applies the query-time knobs of a provisioned profile (`nprobe` for IVF
	/// families, `ef_search` for HNSW).
	pub fn with_profile(mut self, profile: &IndexProfile) -> Self {
		let knob = |key: &str| profile.param_u32(key).and_then(|v| usize::try_from(v).ok());
		match profile.family {
			IndexFamily::IvfFlat | IndexFamily::Pq => self.nprobes = knob("nprobe"),
			IndexFamily::Hnsw => self.ef = knob("ef_search"),
		}
		self
	}

	pub fn dimension(&self) -> usize { self.dimension }

	/// HNSW `ef` for a `k`-result query; never below `k`.
	pub fn query_ef(&self, k: usize) -> Option<usize> { self.ef.map(|ef| ef.max(k)) }

	pub fn connection(&self) -> &Connection { &self.db }

	pub async fn describe_stats(&self) -> Result<IndexStats> {
		let mut namespaces = BTreeMap::new();
		for name in namespace_tables(&self.db).await? {
			let table = self.db.open_table(&name).execute().await?;
			namespaces.insert(name, table.count_rows(None).await?);
		}
		let total_vectors = namespaces.values().sum();
		Ok(IndexStats { dimension: self.dimension, namespaces, total_vectors })
	}

	async fn search(&self, vector: &Embedding, k: usize, namespace: &str) -> Result<Vec<Candidate>> {
		if !table_exists(&self.db, namespace).await? {
			debug!(namespace, "namespace has no table; returning no candidates");
			return Ok(Vec::new());
		}
		let table = self.db.open_table(namespace).execute().await?;
		let mut query = table
			.vector_search(vector.as_slice().to_vec())?
			.distance_type(DistanceType::Cosine)
			.select(Select::columns(&[ID_COLUMN, VECTOR_COLUMN, METADATA_COLUMN]))
			.limit(k);
		if let Some(n) = self.nprobes { query = query.nprobes(n); }
		if let Some(ef) = self.query_ef(k) { query = query.ef(ef); }
		let mut stream = query.execute().await?;
		let mut out = Vec::new();
		while let Some(batch) = stream.try_next().await? {
			out.extend(batch_to_candidates(&batch)?);
		}
		Ok(out)
	}
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
	async fn query(&self, vector: &Embedding, k: usize, namespace: &str) -> imgsearch_core::Result<Vec<Candidate>> {
		validate_namespace(namespace)?;
		check_query_dimension(self.dimension, vector)?;
		if k == 0 { return Ok(Vec::new()); }
		self.search(vector, k, namespace)
			.await
			.map_err(|e| Error::IndexUnavailable(format!("lancedb query on '{namespace}' failed: {e:#}")))
	}
}

/// Rows with a null vector are not returned; unparsable metadata becomes empty.
pub(crate) fn batch_to_candidates(batch: &RecordBatch) -> Result<Vec<Candidate>> {
	let ids = batch.column_by_name(ID_COLUMN).and_then(|c| c.as_any().downcast_ref::<StringArray>()).ok_or_else(|| anyhow::anyhow!("id column missing"))?;
	let vectors = batch.column_by_name(VECTOR_COLUMN).and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>()).ok_or_else(|| anyhow::anyhow!("vector column missing"))?;
	let metadata = batch.column_by_name(METADATA_COLUMN).and_then(|c| c.as_any().downcast_ref::<StringArray>());
	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		if !vectors.is_valid(i) { continue; }
		let inner = vectors.value(i);
		let values = inner.as_primitive::<arrow_array::types::Float32Type>().values().to_vec();
		let id = ids.value(i).to_string();
		let attrs = match metadata.filter(|m| m.is_valid(i)).map(|m| serde_json::from_str::<serde_json::Value>(m.value(i))) {
			Some(Ok(json)) => attributes_from_json(&json),
			Some(Err(e)) => {
				warn!(candidate = %id, error = %e, "unparsable candidate metadata");
				Default::default()
			}
			None => Default::default(),
		};
		out.push(Candidate::new(id, values, attrs));
	}
	Ok(out)
}

/// A query vector of the wrong size means the embedder and the store disagree,
/// which is a deployment fault rather than bad candidate data.
pub(crate) fn check_query_dimension(dimension: usize, vector: &Embedding) -> imgsearch_core::Result<()> {
	if vector.dim() == dimension { return Ok(()); }
	Err(Error::InvalidConfig(format!(
		"query vector has {} dimensions but the index stores {dimension}; check embedding.dim and index.dimension",
		vector.dim()
	)))
}
