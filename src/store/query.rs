//! Record predicates

use std::ops::{BitAnd, BitOr, Not};

use crate::schema::SchemaTree;

/// How a node's value is compared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueMatch {
    /// Value contains the text
    Contains(String),
    /// Value equals the text
    Exact(String),
}

impl ValueMatch {
    pub fn new(text: impl Into<String>, exact: bool) -> Self {
        if exact {
            ValueMatch::Exact(text.into())
        } else {
            ValueMatch::Contains(text.into())
        }
    }

    fn test(&self, value: &str) -> bool {
        match self {
            ValueMatch::Contains(text) => value.contains(text.as_str()),
            ValueMatch::Exact(text) => value == text,
        }
    }
}

/// Predicate over stored records
///
/// Compose with `&`, `|` and `!`:
///
/// ```
/// use taxonopy::store::Query;
///
/// let films_from_1965 = Query::node("Title/Category/Film") & Query::value_is("Title/Year", "1965");
/// let not_books = !Query::node("Title/Category/Book");
/// # let _ = (films_from_1965, not_books);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Every record
    All,
    /// The record has a node at `path`, optionally with a matching value
    Node {
        path: String,
        value: Option<ValueMatch>,
    },
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
    Not(Box<Query>),
}

impl Query {
    pub fn node(path: impl Into<String>) -> Self {
        Query::Node {
            path: path.into(),
            value: None,
        }
    }

    pub fn value_contains(path: impl Into<String>, text: impl Into<String>) -> Self {
        Query::Node {
            path: path.into(),
            value: Some(ValueMatch::Contains(text.into())),
        }
    }

    pub fn value_is(path: impl Into<String>, text: impl Into<String>) -> Self {
        Query::Node {
            path: path.into(),
            value: Some(ValueMatch::Exact(text.into())),
        }
    }

    /// Node query with an optional value test, as taken from the command line
    pub fn from_parts(path: &str, value: Option<&str>, exact: bool) -> Self {
        Query::Node {
            path: path.to_string(),
            value: value.map(|v| ValueMatch::new(v, exact)),
        }
    }

    pub fn matches(&self, record: &SchemaTree) -> bool {
        match self {
            Query::All => true,
            Query::Node { path, value } => match record.try_find(path) {
                None => false,
                Some(id) => match value {
                    None => true,
                    Some(test) => record.node(id).attr("value").is_some_and(|v| test.test(v)),
                },
            },
            Query::And(a, b) => a.matches(record) && b.matches(record),
            Query::Or(a, b) => a.matches(record) || b.matches(record),
            Query::Not(q) => !q.matches(record),
        }
    }
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Query) -> Query {
        Query::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Query {
    type Output = Query;

    fn bitor(self, rhs: Query) -> Query {
        Query::Or(Box::new(self), Box::new(rhs))
    }
}

impl Not for Query {
    type Output = Query;

    fn not(self) -> Query {
        Query::Not(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, category: &str) -> SchemaTree {
        let mut tree = SchemaTree::new();
        tree.add_node("Title", None, [("type", "str"), ("value", title)])
            .unwrap();
        tree.add_node("Category", Some("Title"), [("inquire", "list")])
            .unwrap();
        tree.add_node(category, Some("Title/Category"), [("type", "str")])
            .unwrap();
        tree
    }

    #[test]
    fn test_node_and_value_tests() {
        let dune = record("Dune", "Book");
        assert!(Query::node("Title/Category/Book").matches(&dune));
        assert!(!Query::node("Title/Category/Film").matches(&dune));
        assert!(Query::value_contains("Title", "un").matches(&dune));
        assert!(!Query::value_is("Title", "Dun").matches(&dune));
        assert!(Query::value_is("/Title/", "Dune").matches(&dune));
        // node present but without a value
        assert!(!Query::value_contains("Title/Category", "").matches(&dune));
    }

    #[test]
    fn test_combinators() {
        let dune = record("Dune", "Book");
        let alien = record("Alien", "Film");

        let q = Query::node("Title/Category/Film") | Query::value_is("Title", "Dune");
        assert!(q.matches(&dune));
        assert!(q.matches(&alien));

        let q = Query::node("Title") & !Query::node("Title/Category/Book");
        assert!(!q.matches(&dune));
        assert!(q.matches(&alien));

        assert!(Query::All.matches(&SchemaTree::new()));
    }
}
