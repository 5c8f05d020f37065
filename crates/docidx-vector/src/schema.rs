use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Table holding the dense vectors inside the index directory.
pub const VECTORS_TABLE: &str = "vectors";
pub const ORDINAL_COLUMN: &str = "ordinal";
pub const VECTOR_COLUMN: &str = "vector";
/// Column LanceDB appends to vector search results.
pub const DISTANCE_COLUMN: &str = "_distance";

pub fn vector_field(dim: i32) -> Field {
	Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true)
}

pub fn build_vectors_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ORDINAL_COLUMN, DataType::UInt64, false),
		vector_field(dim),
	]))
}

/// Dimensionality recorded in a `vectors` table schema.
pub fn dim_of(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
		DataType::FixedSizeList(item, size) if item.data_type() == &DataType::Float32 => usize::try_from(*size).ok(),
		_ => None,
	}
}
