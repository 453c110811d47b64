//! Flat (spreadsheet) view of schema and record trees
//!
//! Every column is addressed by a flat key: the names from below the root
//! down to the node joined with a title separator (`Category:Book:Author`).
//! The root column uses the root's own name. Option children of a header
//! that hold nothing (no type, no children) get no column of their own; a
//! choice is recorded in the header's cell instead.

use crate::core::tree::{NodeId, PATH_SEPARATOR};
use crate::schema::attributes::{NodeAttributes, SchemaNode, SchemaTree};

/// Flat key of a node
pub fn flat_key(node: SchemaNode<'_>, title_sep: &str) -> String {
    let path = node.path();
    let mut names = path.split(PATH_SEPARATOR);
    let root = names.next().unwrap_or_default();
    let rest: Vec<&str> = names.collect();
    if rest.is_empty() {
        root.to_string()
    } else {
        rest.join(title_sep)
    }
}

/// Nodes that get a column, in pre-order
pub fn flat_columns(tree: &SchemaTree) -> Vec<NodeId> {
    let mut columns = Vec::new();
    if let Some(root) = tree.root() {
        columns.push(root.id());
        collect_columns(root, &mut columns);
    }
    columns
}

fn collect_columns(node: SchemaNode<'_>, columns: &mut Vec<NodeId>) {
    let is_header = NodeAttributes::of(node).is_header();
    for child in node.children() {
        if is_header && !child.has_children() && child.attr("type").is_none() {
            continue;
        }
        columns.push(child.id());
        collect_columns(child, columns);
    }
}

/// Column titles of a tree
pub fn flat_titles(tree: &SchemaTree, title_sep: &str) -> Vec<String> {
    flat_columns(tree)
        .into_iter()
        .map(|id| flat_key(tree.node(id), title_sep))
        .collect()
}

/// Whether each column of a schema is required, aligned with [`flat_titles`]
pub fn required_flags(schema: &SchemaTree) -> Vec<bool> {
    flat_columns(schema)
        .into_iter()
        .map(|id| NodeAttributes::of(schema.node(id)).required)
        .collect()
}

/// Cell text of a record, keyed by column title
///
/// A cell holds the node's value followed by the names of its chosen
/// children when the node is a header, joined with `value_sep`.
pub fn flat_values(record: &SchemaTree, title_sep: &str, value_sep: &str) -> Vec<(String, String)> {
    flat_columns(record)
        .into_iter()
        .map(|id| {
            let node = record.node(id);
            let attrs = NodeAttributes::of(node);
            let mut parts: Vec<String> = attrs.value.map(str::to_string).into_iter().collect();
            if attrs.is_header() {
                parts.extend(node.child_names());
            }
            (flat_key(node, title_sep), parts.join(value_sep))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ATTRS: [(&str, &str); 0] = [];

    fn schema() -> SchemaTree {
        let mut tree = SchemaTree::new();
        tree.add_node("Title", None, [("type", "str"), ("required", "True")])
            .unwrap();
        tree.add_node("Category", Some("Title"), [("inquire", "list"), ("required", "True")])
            .unwrap();
        tree.add_node("Book", Some("Title/Category"), NO_ATTRS).unwrap();
        tree.add_node("Author", Some("Title/Category/Book"), [("type", "str")])
            .unwrap();
        tree.add_node("Film", Some("Title/Category"), NO_ATTRS).unwrap();
        tree.add_node("Year", Some("Title"), [("type", "int")]).unwrap();
        tree
    }

    #[test]
    fn test_titles_skip_plain_options() {
        let titles = flat_titles(&schema(), ":");
        assert_eq!(
            titles,
            vec!["Title", "Category", "Category:Book", "Category:Book:Author", "Year"]
        );
    }

    #[test]
    fn test_required_flags_align_with_titles() {
        assert_eq!(
            required_flags(&schema()),
            vec![true, true, false, false, false]
        );
    }

    #[test]
    fn test_values_join_value_and_choice() {
        let mut record = SchemaTree::new();
        record
            .add_node("Title", None, [("type", "str"), ("value", "Dune")])
            .unwrap();
        record
            .add_node("Category", Some("Title"), [("inquire", "list")])
            .unwrap();
        record.add_node("Film", Some("Title/Category"), NO_ATTRS).unwrap();

        let values = flat_values(&record, ":", ", ");
        assert_eq!(
            values,
            vec![
                ("Title".to_string(), "Dune".to_string()),
                ("Category".to_string(), "Film".to_string()),
            ]
        );
    }

    #[test]
    fn test_custom_separator() {
        let tree = schema();
        let author = tree.find_by_path("Title/Category/Book/Author").unwrap();
        assert_eq!(flat_key(tree.node(author), "|"), "Category|Book|Author");
        assert_eq!(flat_key(tree.root().unwrap(), "|"), "Title");
    }
}
