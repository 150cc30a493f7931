//! Arrow schemas for candidate tables and the key/value meta table.
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub const ID_COLUMN: &str = "id";
pub const VECTOR_COLUMN: &str = "vector";
/// Candidate attributes, stored as a JSON object string.
pub const METADATA_COLUMN: &str = "metadata";

/// One table per namespace: `id`, `vector` (fixed-size list of `dim` f32), `metadata`.
pub fn build_candidate_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ID_COLUMN, DataType::Utf8, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
		Field::new(METADATA_COLUMN, DataType::Utf8, false),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}
