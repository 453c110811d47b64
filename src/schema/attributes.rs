//! Schema attribute vocabulary and typed node views

use std::fmt;
use std::str::FromStr;

use crate::core::tree::{NodeRef, Tree, Vocabulary};

/// Attribute keys a schema or record node may carry
pub const SCHEMA_ATTRIBUTES: &[&str] = &[
    "type",
    "default",
    "value",
    "inquire",
    "required",
    "import",
    "description",
];

/// Fixed attribute vocabulary for schema and record trees
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaVocabulary;

impl Vocabulary for SchemaVocabulary {
    fn admits(key: &str) -> bool {
        SCHEMA_ATTRIBUTES.contains(&key)
    }
}

/// A schema, or a record shaped by one
pub type SchemaTree = Tree<SchemaVocabulary>;

/// A node of a [`SchemaTree`]
pub type SchemaNode<'a> = NodeRef<'a, SchemaVocabulary>;

/// Decision mode of a header node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inquire {
    /// Pick exactly one child
    List,
    /// Pick any number of children
    Checkbox,
}

impl Inquire {
    pub fn as_str(&self) -> &'static str {
        match self {
            Inquire::List => "list",
            Inquire::Checkbox => "checkbox",
        }
    }
}

impl fmt::Display for Inquire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Inquire {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Inquire::List),
            "checkbox" => Ok(Inquire::Checkbox),
            other => Err(format!("unknown inquire mode '{}'", other)),
        }
    }
}

/// Interpret a boolean-as-string attribute
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}

/// Typed view over the attribute bag of one schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAttributes<'a> {
    pub type_name: Option<&'a str>,
    pub default: Option<&'a str>,
    pub value: Option<&'a str>,
    pub inquire: Option<Inquire>,
    pub required: bool,
    pub import: Option<&'a str>,
    pub description: Option<&'a str>,
}

impl<'a> NodeAttributes<'a> {
    pub fn of(node: SchemaNode<'a>) -> Self {
        let inquire = node.attr("inquire").and_then(|mode| match mode.parse() {
            Ok(mode) => Some(mode),
            Err(e) => {
                tracing::warn!(node = %node.path(), "{}; treating as a plain node", e);
                None
            }
        });

        Self {
            type_name: node.attr("type"),
            default: node.attr("default"),
            value: node.attr("value"),
            inquire,
            required: node.attr("required").is_some_and(parse_flag),
            import: node.attr("import"),
            description: node.attr("description"),
        }
    }

    /// Whether the node holds a directly entered value
    pub fn is_typed(&self) -> bool {
        self.type_name.is_some()
    }

    /// Whether the node is a single- or multi-choice decision point
    pub fn is_header(&self) -> bool {
        self.inquire.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_drops_unknown_keys() {
        let mut tree = SchemaTree::new();
        tree.add_node("Title", None, [("type", "str"), ("colour", "red")])
            .unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.attr("type"), Some("str"));
        assert!(root.attr("colour").is_none());
        assert_eq!(tree.known_attributes().collect::<Vec<_>>(), vec!["type"]);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("True"));
        assert!(parse_flag("yes"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("False"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_node_attributes_view() {
        let mut tree = SchemaTree::new();
        tree.add_node("Title", None, [("type", "str"), ("required", "True")])
            .unwrap();
        tree.add_node("Kind", Some("Title"), [("inquire", "checkbox")])
            .unwrap();
        tree.add_node("Odd", Some("Title"), [("inquire", "radio")])
            .unwrap();

        let root = NodeAttributes::of(tree.root().unwrap());
        assert!(root.is_typed());
        assert!(root.required);
        assert!(!root.is_header());

        let kind = NodeAttributes::of(tree.node(tree.find_by_path("Title/Kind").unwrap()));
        assert_eq!(kind.inquire, Some(Inquire::Checkbox));
        assert!(!kind.required);

        let odd = NodeAttributes::of(tree.node(tree.find_by_path("Title/Odd").unwrap()));
        assert!(odd.inquire.is_none());
    }
}
