//! Batch record builder answering from a flat row

use std::collections::BTreeMap;

use crate::builder::walk::{AnswerSource, Walker};
use crate::builder::BuildError;
use crate::schema::{flat_key, NodeAttributes, SchemaNode, SchemaTree, TypeRegistry};

/// One spreadsheet row: column title to cell text
pub type FlatRow = BTreeMap<String, String>;

/// Builds records from flat rows keyed by column title
///
/// Without `strict`, a bad or missing optional cell just leaves its branch
/// out of the record. With `strict`, any cell that doesn't fit the schema is
/// an error. Required cells must always be present and valid.
pub struct FlatRecordBuilder<'s> {
    schema: &'s SchemaTree,
    types: TypeRegistry,
    title_sep: String,
    value_sep: String,
    strict: bool,
}

impl<'s> FlatRecordBuilder<'s> {
    pub fn new(schema: &'s SchemaTree) -> Self {
        Self {
            schema,
            types: TypeRegistry::default(),
            title_sep: ":".to_string(),
            value_sep: ", ".to_string(),
            strict: false,
        }
    }

    pub fn title_sep(mut self, sep: impl Into<String>) -> Self {
        self.title_sep = sep.into();
        self
    }

    pub fn value_sep(mut self, sep: impl Into<String>) -> Self {
        self.value_sep = sep.into();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    pub fn build(&self, row: &FlatRow) -> Result<SchemaTree, BuildError> {
        let mut answers = RowAnswers {
            row,
            builder: self,
        };
        Walker::full(self.schema)?.run(&mut answers)
    }
}

struct RowAnswers<'r, 's> {
    row: &'r FlatRow,
    builder: &'r FlatRecordBuilder<'s>,
}

impl RowAnswers<'_, '_> {
    /// Trimmed, non-empty cell entries for a node
    ///
    /// A typed header keeps its value first and its choices after it in the
    /// same cell.
    fn entries(&self, node: SchemaNode<'_>) -> Vec<&str> {
        let key = flat_key(node, &self.builder.title_sep);
        self.row
            .get(&key)
            .map(|cell| {
                cell.split(self.builder.value_sep.as_str())
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn choice_entries(&self, node: SchemaNode<'_>, attrs: &NodeAttributes<'_>) -> Vec<String> {
        let entries = self.entries(node);
        let skip = usize::from(attrs.is_typed());
        entries.into_iter().skip(skip).map(str::to_string).collect()
    }

    fn missing(&self, node: SchemaNode<'_>) -> BuildError {
        BuildError::invalid(
            node,
            format!(
                "required, but column '{}' has no value",
                flat_key(node, &self.builder.title_sep)
            ),
        )
    }
}

impl AnswerSource for RowAnswers<'_, '_> {
    fn typed_value(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
    ) -> Result<Option<String>, BuildError> {
        let raw = if attrs.is_header() {
            self.entries(node).first().map(|s| s.to_string())
        } else {
            let key = flat_key(node, &self.builder.title_sep);
            self.row
                .get(&key)
                .map(|cell| cell.trim().to_string())
                .filter(|cell| !cell.is_empty())
        };

        let Some(value) = raw else {
            if attrs.required {
                return Err(self.missing(node));
            }
            return Ok(None);
        };

        let type_name = attrs.type_name.unwrap_or("str");
        let accepted = self
            .builder
            .types
            .accepts(type_name, attrs.import, &value)
            .map_err(|e| BuildError::unknown_type(node, e))?;
        if accepted {
            return Ok(Some(value));
        }

        let reason = format!(
            "'{}' is not a valid {}",
            value,
            TypeRegistry::qualify(type_name, attrs.import)
        );
        if attrs.required || self.builder.strict {
            return Err(BuildError::invalid(node, reason));
        }
        tracing::debug!(node = %node.path(), "{}; skipped", reason);
        Ok(None)
    }

    fn choose_one(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
        choices: &[String],
        required: bool,
    ) -> Result<Option<String>, BuildError> {
        let entries = self.choice_entries(node, attrs);
        let Some(choice) = entries.into_iter().next() else {
            if required {
                return Err(self.missing(node));
            }
            return Ok(None);
        };

        if choices.contains(&choice) {
            return Ok(Some(choice));
        }

        let reason = format!("'{}' is not one of: {}", choice, choices.join(", "));
        if required || self.builder.strict {
            return Err(BuildError::invalid(node, reason));
        }
        tracing::debug!(node = %node.path(), "{}; skipped", reason);
        Ok(None)
    }

    fn choose_many(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
        choices: &[String],
    ) -> Result<Vec<String>, BuildError> {
        let entries = self.choice_entries(node, attrs);
        if entries.is_empty() {
            if attrs.required {
                return Err(self.missing(node));
            }
            return Ok(Vec::new());
        }

        let (valid, invalid): (Vec<String>, Vec<String>) =
            entries.into_iter().partition(|e| choices.contains(e));

        if !invalid.is_empty() && self.builder.strict {
            return Err(BuildError::invalid(
                node,
                format!(
                    "'{}' not among: {}",
                    invalid.join("', '"),
                    choices.join(", ")
                ),
            ));
        }
        if valid.is_empty() && attrs.required {
            return Err(BuildError::invalid(
                node,
                format!("no valid entries, expected any of: {}", choices.join(", ")),
            ));
        }
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ATTRS: [(&str, &str); 0] = [];

    fn row(cells: &[(&str, &str)]) -> FlatRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn title_schema() -> SchemaTree {
        let mut schema = SchemaTree::new();
        schema
            .add_node("Title", None, [("type", "str"), ("required", "True")])
            .unwrap();
        schema
    }

    fn library_schema() -> SchemaTree {
        let mut schema = title_schema();
        schema
            .add_node("Category", Some("Title"), [("inquire", "list"), ("required", "True")])
            .unwrap();
        schema.add_node("Book", Some("Title/Category"), NO_ATTRS).unwrap();
        schema
            .add_node("Pages", Some("Title/Category/Book"), [("type", "int")])
            .unwrap();
        schema.add_node("Film", Some("Title/Category"), NO_ATTRS).unwrap();
        schema.add_node("Year", Some("Title"), [("type", "int")]).unwrap();
        schema
            .add_node("Tags", Some("Title"), [("inquire", "checkbox")])
            .unwrap();
        for tag in ["A", "B", "C"] {
            schema.add_node(tag, Some("Title/Tags"), NO_ATTRS).unwrap();
        }
        schema
    }

    #[test]
    fn test_required_value_missing_in_strict_mode() {
        let schema = title_schema();
        let err = FlatRecordBuilder::new(&schema)
            .strict(true)
            .build(&FlatRow::new())
            .unwrap_err();
        match err {
            BuildError::Validation { node, path, .. } => {
                assert_eq!(node, "Title");
                assert_eq!(path, "Title");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_required_value_present() {
        let schema = title_schema();
        let record = FlatRecordBuilder::new(&schema)
            .strict(true)
            .build(&row(&[("Title", "42")]))
            .unwrap();
        assert_eq!(record.root().unwrap().attr("value"), Some("42"));
    }

    #[test]
    fn test_checkbox_uses_schema_order() {
        let schema = library_schema();
        let record = FlatRecordBuilder::new(&schema)
            .build(&row(&[
                ("Title", "Dune"),
                ("Category", "Film"),
                ("Tags", "C, A"),
            ]))
            .unwrap();
        let tags = record.node(record.find_by_path("Title/Tags").unwrap());
        assert_eq!(tags.child_names(), vec!["A", "C"]);
    }

    #[test]
    fn test_nested_value_under_choice() {
        let schema = library_schema();
        let record = FlatRecordBuilder::new(&schema)
            .build(&row(&[
                ("Title", "Dune"),
                ("Category", "Book"),
                ("Category:Book:Pages", "412"),
                ("Year", "1965"),
            ]))
            .unwrap();

        let pages = record.find_by_path("Title/Category/Book/Pages").unwrap();
        assert_eq!(record.node(pages).attr("value"), Some("412"));
        let year = record.find_by_path("Title/Year").unwrap();
        assert_eq!(record.node(year).attr("value"), Some("1965"));
        assert!(!record.contains("Title/Tags"));
    }

    #[test]
    fn test_lenient_skips_bad_optional_values() {
        let schema = library_schema();
        let cells = row(&[
            ("Title", "Dune"),
            ("Category", "Book"),
            ("Year", "nineteen sixty-five"),
            ("Tags", "A, Z"),
        ]);

        let record = FlatRecordBuilder::new(&schema).build(&cells).unwrap();
        assert!(!record.contains("Title/Year"));
        let tags = record.node(record.find_by_path("Title/Tags").unwrap());
        assert_eq!(tags.child_names(), vec!["A"]);

        let err = FlatRecordBuilder::new(&schema)
            .strict(true)
            .build(&cells)
            .unwrap_err();
        match err {
            BuildError::Validation { node, .. } => assert_eq!(node, "Year"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strict_rejects_unknown_checkbox_entry() {
        let schema = library_schema();
        let err = FlatRecordBuilder::new(&schema)
            .strict(true)
            .build(&row(&[("Title", "Dune"), ("Category", "Book"), ("Tags", "A, Z")]))
            .unwrap_err();
        match err {
            BuildError::Validation { node, reason, .. } => {
                assert_eq!(node, "Tags");
                assert!(reason.contains("'Z'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_required_choice_must_be_valid() {
        let schema = library_schema();
        let err = FlatRecordBuilder::new(&schema)
            .build(&row(&[("Title", "Dune"), ("Category", "Album")]))
            .unwrap_err();
        assert!(matches!(err, BuildError::Validation { ref node, .. } if node == "Category"));
    }

    #[test]
    fn test_custom_separators() {
        let schema = library_schema();
        let record = FlatRecordBuilder::new(&schema)
            .title_sep("/")
            .value_sep(";")
            .build(&row(&[
                ("Title", "Dune"),
                ("Category", "Book"),
                ("Category/Book/Pages", "412"),
                ("Tags", "B;A"),
            ]))
            .unwrap();
        assert!(record.contains("Title/Category/Book/Pages"));
        let tags = record.node(record.find_by_path("Title/Tags").unwrap());
        assert_eq!(tags.child_names(), vec!["A", "B"]);
    }

    #[test]
    fn test_typed_header_shares_cell() {
        let mut schema = title_schema();
        schema
            .add_node("Rating", Some("Title"), [("type", "int"), ("inquire", "list")])
            .unwrap();
        schema.add_node("Stars", Some("Title/Rating"), NO_ATTRS).unwrap();
        schema.add_node("Points", Some("Title/Rating"), NO_ATTRS).unwrap();

        let record = FlatRecordBuilder::new(&schema)
            .build(&row(&[("Title", "Dune"), ("Rating", "5, Stars")]))
            .unwrap();

        let rating = record.node(record.find_by_path("Title/Rating").unwrap());
        assert_eq!(rating.attr("value"), Some("5"));
        assert_eq!(rating.child_names(), vec!["Stars"]);
    }

    #[test]
    fn test_missing_optional_root_is_an_error() {
        let mut schema = SchemaTree::new();
        schema.add_node("Title", None, [("type", "str")]).unwrap();
        schema.add_node("Year", Some("Title"), [("type", "int")]).unwrap();

        let err = FlatRecordBuilder::new(&schema)
            .build(&row(&[("Year", "1965")]))
            .unwrap_err();
        match err {
            BuildError::Validation { node, reason, .. } => {
                assert_eq!(node, "Title");
                assert!(reason.contains("record is empty"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_choice_header_without_options() {
        let mut schema = title_schema();
        schema
            .add_node("Format", Some("Title"), [("inquire", "checkbox")])
            .unwrap();

        let err = FlatRecordBuilder::new(&schema)
            .build(&row(&[("Title", "Dune")]))
            .unwrap_err();
        assert!(matches!(err, BuildError::Validation { ref node, .. } if node == "Format"));
    }
}
