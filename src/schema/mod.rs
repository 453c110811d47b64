//! Schema system - attribute vocabulary, value types and flat views

pub mod attributes;
pub mod flat;
pub mod types;

pub use attributes::{
    parse_flag, Inquire, NodeAttributes, SchemaNode, SchemaTree, SchemaVocabulary,
    SCHEMA_ATTRIBUTES,
};
pub use flat::{flat_columns, flat_key, flat_titles, flat_values, required_flags};
pub use types::{TypeError, TypeRegistry, Validator};

/// Attributes shown when rendering a schema
pub const SCHEMA_RENDER_ATTRIBUTES: &[&str] = &["type", "inquire", "required"];

/// Attributes shown when rendering a record
pub const RECORD_RENDER_ATTRIBUTES: &[&str] = &["value"];

/// Directory-style rendering of a schema
pub fn render_schema(schema: &SchemaTree) -> String {
    schema.render_with(SCHEMA_RENDER_ATTRIBUTES)
}

/// Directory-style rendering of a record
pub fn render_record(record: &SchemaTree) -> String {
    record.render_with(RECORD_RENDER_ATTRIBUTES)
}
