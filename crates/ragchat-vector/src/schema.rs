use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub fn build_documents_schema(dim: usize) -> Arc<Schema> {
	let dim = i32::try_from(dim).unwrap_or(i32::MAX);
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("metadata", DataType::Utf8, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Vector width of an existing table, if it has a fixed-size `vector` column.
pub fn stored_vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name("vector").map(|f| f.data_type()) {
		Ok(DataType::FixedSizeList(_, n)) => usize::try_from(*n).ok(),
		_ => None,
	}
}
