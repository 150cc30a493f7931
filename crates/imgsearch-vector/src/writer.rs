use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::{connect, Connection};
use arrow_array::{RecordBatch, RecordBatchIterator, FixedSizeListArray, StringArray};
use std::sync::Arc;
use std::path::Path;
use tracing::info;

use imgsearch_core::{Candidate, Error};
use crate::schema::build_candidate_schema;
use crate::table::{ensure_namespace_table, validate_namespace};

const BATCH_SIZE: usize = 1000;

/// Upserts candidates (id, vector, metadata) into one namespace table.
pub struct LanceCandidateWriter { pub(crate) db: Connection, pub(crate) namespace: String, pub(crate) dimension: usize, show_progress: bool }

impl LanceCandidateWriter {
	pub async fn new(db_path: &Path, namespace: &str, dimension: usize) -> Result<Self> {
		let db = connect(db_path.to_string_lossy().as_ref()).execute().await?;
		Self::from_connection(db, namespace, dimension)
	}

	pub fn from_connection(db: Connection, namespace: &str, dimension: usize) -> Result<Self> {
		validate_namespace(namespace)?;
		Ok(Self { db, namespace: namespace.to_string(), dimension, show_progress: false })
	}

	/// Draw an indicatif progress bar while writing.
	pub fn with_progress(mut self, show: bool) -> Self { self.show_progress = show; self }

	/// Inserts new ids and replaces existing ones. Returns the number of rows written.
	///
	/// Every embedding must have the table dimension; otherwise nothing is written.
	pub async fn upsert(&self, candidates: &[Candidate]) -> Result<usize> {
		if candidates.is_empty() { return Ok(0); }
		if let Some(bad) = candidates.iter().find(|c| c.embedding.dim() != self.dimension) {
			return Err(Error::DimensionMismatch { expected: self.dimension, actual: bad.embedding.dim() }.into());
		}
		ensure_namespace_table(&self.db, &self.namespace, self.dimension).await?;
		info!(namespace = %self.namespace, count = candidates.len(), "upserting candidates");
		let pb = if self.show_progress { ProgressBar::new(candidates.len() as u64) } else { ProgressBar::hidden() };
		let style = ProgressStyle::default_bar()
			.template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} candidates ({percent}%) {msg}")
			.map(|s| s.progress_chars("#>-"))
			.unwrap_or_else(|_| ProgressStyle::default_bar());
		pb.set_style(style);
		let mut written = 0usize;
		for batch in candidates.chunks(BATCH_SIZE) {
			written += self.upsert_batch(batch).await?;
			pb.inc(batch.len() as u64);
		}
		pb.finish_with_message("done");
		Ok(written)
	}

	async fn upsert_batch(&self, batch: &[Candidate]) -> Result<usize> {
		let record_batch = self.to_record_batch(batch)?; let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		let table = self.db.open_table(&self.namespace).execute().await?;
		let mut mi = table.merge_insert(&["id"]);
		mi.when_matched_update_all(None).when_not_matched_insert_all();
		let res = mi.execute(reader).await?;
		Ok((res.num_inserted_rows + res.num_updated_rows) as usize)
	}

	fn to_record_batch(&self, batch: &[Candidate]) -> Result<RecordBatch> {
		let dim = i32::try_from(self.dimension)?;
		let schema = build_candidate_schema(dim);
		let mut ids = Vec::with_capacity(batch.len()); let mut metadata = Vec::with_capacity(batch.len()); let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(batch.len());
		for c in batch {
			ids.push(c.id.clone());
			metadata.push(serde_json::to_string(&c.metadata)?);
			vectors.push(Some(c.embedding.as_slice().iter().map(|&x| Some(x)).collect()));
		}
		let record_batch = RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
			Arc::new(StringArray::from(metadata)),
		])?;
		Ok(record_batch)
	}
}
