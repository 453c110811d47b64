//! Generic labeled tree with path addressing
//!
//! Nodes live in an arena owned by the [`Tree`]. Outside code addresses them
//! by slash-delimited paths made of node names from the root down
//! (`Title/Category/Book`). [`NodeId`] handles are stable for the life of the
//! tree: detaching a node leaves it in the arena as an orphan, so a handle
//! never silently starts pointing at a different node.
//!
//! Which attribute keys a tree keeps is decided by its [`Vocabulary`]. The
//! open [`AnyAttribute`] vocabulary keeps everything; schema trees use a fixed
//! set (see [`crate::schema::SchemaVocabulary`]).

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use miette::Diagnostic;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::level::{level_key, LeveledData, NodeRecord};

/// Separator between node names in a path
pub const PATH_SEPARATOR: char = '/';

/// Keys that describe tree structure and can never be stored as attributes
const RESERVED_KEYS: &[&str] = &["name", "parent"];

/// Attribute bag carried by each node
pub type Attributes = BTreeMap<String, String>;

/// Errors raised while loading, addressing or mutating a tree
#[derive(Debug, Error, Diagnostic)]
pub enum TreeError {
    #[error("malformed tree data at {entry}: {reason}")]
    #[diagnostic(
        code(taxonopy::tree::format),
        help("every entry below L0 needs `name` and `parent`, and a parent must appear on a lower level")
    )]
    Format { entry: String, reason: String },

    #[error("no node at path '{path}' (no match for '{segment}')")]
    #[diagnostic(code(taxonopy::tree::not_found))]
    NodeNotFound { path: String, segment: String },

    #[error("tree is empty")]
    #[diagnostic(code(taxonopy::tree::empty))]
    EmptyTree,

    #[error("invalid node name '{0}': names must be non-empty and may not contain '/'")]
    #[diagnostic(code(taxonopy::tree::name))]
    InvalidName(String),

    #[error("JSON error: {0}")]
    #[diagnostic(code(taxonopy::tree::json))]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(taxonopy::tree::io))]
    Io(#[from] std::io::Error),
}

impl TreeError {
    fn format(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        TreeError::Format {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

/// Decides which attribute keys a tree persists
pub trait Vocabulary: Clone + Default + fmt::Debug {
    fn admits(key: &str) -> bool;
}

/// Vocabulary that keeps every attribute
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyAttribute;

impl Vocabulary for AnyAttribute {
    fn admits(_key: &str) -> bool {
        true
    }
}

/// Handle to a node inside one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attrs: Attributes,
}

/// Result of a by-name search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Exactly one node carries the name
    One(NodeId),
    /// Zero or several nodes carry the name; callers must disambiguate
    Many(Vec<NodeId>),
}

/// Kind of difference reported by [`Tree::diff`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    Added,
    Deleted,
    Changed,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Change::Added => "added",
            Change::Deleted => "deleted",
            Change::Changed => "changed",
        };
        f.write_str(s)
    }
}

/// A labeled tree addressed by slash paths
#[derive(Debug, Clone, Default)]
pub struct Tree<V: Vocabulary = AnyAttribute> {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
    known_attrs: BTreeSet<String>,
    vocabulary: PhantomData<V>,
}

impl<V: Vocabulary> Tree<V> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            known_attrs: BTreeSet::new(),
            vocabulary: PhantomData,
        }
    }

    // ------------------------------------------------------------------
    // Construction and serialization
    // ------------------------------------------------------------------

    /// Build a tree from its leveled representation
    ///
    /// Levels are processed in ascending order so every parent path must
    /// already exist, on a lower level, when a node is added.
    pub fn from_dict(data: &LeveledData) -> Result<Self, TreeError> {
        let mut tree = Self::new();

        for (expected, (level, records)) in data.levels().enumerate() {
            if level != expected {
                return Err(TreeError::format(
                    level_key(expected),
                    format!("level missing before {}", level_key(level)),
                ));
            }

            if level == 0 {
                let [root] = records else {
                    return Err(TreeError::format(
                        level_key(0),
                        format!("expected exactly one root entry, found {}", records.len()),
                    ));
                };
                let entry = format!("{}[0]", level_key(0));
                if root.parent.is_some() {
                    return Err(TreeError::format(entry, "root entry may not have a `parent`"));
                }
                let name = root
                    .name
                    .as_deref()
                    .ok_or_else(|| TreeError::format(&entry, "missing `name`"))?;
                let attrs = scalar_attributes(root, &entry)?;
                tree.add_node(name, None, attrs)?;
                continue;
            }

            for (i, record) in records.iter().enumerate() {
                let entry = format!("{}[{}]", level_key(level), i);
                let name = record
                    .name
                    .as_deref()
                    .ok_or_else(|| TreeError::format(&entry, "missing `name`"))?;
                let parent = record
                    .parent
                    .as_deref()
                    .ok_or_else(|| TreeError::format(&entry, format!("'{}' is missing `parent`", name)))?;
                let parent_id = tree.try_find(parent).ok_or_else(|| {
                    TreeError::format(
                        &entry,
                        format!("parent '{}' of '{}' does not resolve to an earlier node", parent, name),
                    )
                })?;
                if tree.depth(parent_id) >= level {
                    return Err(TreeError::format(
                        &entry,
                        format!("parent '{}' of '{}' is not on a lower level", parent, name),
                    ));
                }
                let attrs = scalar_attributes(record, &entry)?;
                tree.insert_child(parent_id, name, attrs)?;
            }
        }

        Ok(tree)
    }

    /// Build a tree from JSON text or from the path of a file holding it
    pub fn from_json(source: &str) -> Result<Self, TreeError> {
        let path = Path::new(source);
        if path.is_file() {
            Self::from_json_file(path)
        } else {
            Self::from_json_str(source)
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, TreeError> {
        let data: LeveledData = serde_json::from_str(text)?;
        Self::from_dict(&data)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, TreeError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Level-order representation of the tree
    ///
    /// Each entry carries `name`, the parent path (except the root) and every
    /// known attribute the node has, sorted by key.
    pub fn to_dict(&self) -> LeveledData {
        let mut data = LeveledData::new();
        for (level, ids) in self.levels().into_iter().enumerate() {
            for id in ids {
                let node = self.data(id);
                let parent = node.parent.map(|p| self.path_of(p));
                let mut record = NodeRecord::new(node.name.clone(), parent);
                for key in &self.known_attrs {
                    if let Some(value) = node.attrs.get(key) {
                        record
                            .attributes
                            .insert(key.clone(), Value::String(value.clone()));
                    }
                }
                data.push(level, record);
            }
        }
        data
    }

    /// Pretty-printed Tree-JSON (four-space indent)
    pub fn to_json(&self) -> Result<String, TreeError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.to_dict().serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write Tree-JSON to a file
    pub fn write_json(&self, path: &Path) -> Result<(), TreeError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of nodes reachable from the root
    pub fn len(&self) -> usize {
        self.preorder().len()
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root(&self) -> Option<NodeRef<'_, V>> {
        self.root.map(|id| NodeRef { tree: self, id })
    }

    /// Read-only view of a node; `None` if the handle is not from this tree
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, V>> {
        (id.0 < self.nodes.len()).then_some(NodeRef { tree: self, id })
    }

    /// Read-only view of a node handle obtained from this tree
    ///
    /// # Panics
    ///
    /// Panics if the handle belongs to another tree.
    pub fn node(&self, id: NodeId) -> NodeRef<'_, V> {
        assert!(id.0 < self.nodes.len(), "node handle from another tree");
        NodeRef { tree: self, id }
    }

    /// Attribute keys ever stored in this tree, sorted
    pub fn known_attributes(&self) -> impl Iterator<Item = &str> {
        self.known_attrs.iter().map(String::as_str)
    }

    /// Slash path of a node, root name first
    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let data = self.data(node);
            names.push(data.name.as_str());
            current = data.parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Number of ancestors between a node and its root
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.data(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.data(parent).parent;
        }
        depth
    }

    /// Node handles in pre-order (root, then each child subtree in order)
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.data(id).children.iter().rev().copied());
        }
        out
    }

    /// Node handles grouped by depth (breadth-first)
    pub fn levels(&self) -> Vec<Vec<NodeId>> {
        let mut levels = Vec::new();
        let mut current: Vec<NodeId> = self.root.into_iter().collect();
        while !current.is_empty() {
            let next = current
                .iter()
                .flat_map(|id| self.data(*id).children.iter().copied())
                .collect();
            levels.push(current);
            current = next;
        }
        levels
    }

    // ------------------------------------------------------------------
    // Path resolution
    // ------------------------------------------------------------------

    /// Resolve a slash path to a node
    ///
    /// Leading and trailing slashes are ignored. The first segment must be
    /// the root's name; each following segment names a child of the node
    /// resolved so far. With duplicate sibling names the first one wins.
    pub fn find_by_path(&self, path: &str) -> Result<NodeId, TreeError> {
        let mut segments = path.trim_matches(PATH_SEPARATOR).split(PATH_SEPARATOR);
        let not_found = |segment: &str| TreeError::NodeNotFound {
            path: path.to_string(),
            segment: segment.to_string(),
        };

        let first = segments.next().unwrap_or_default();
        let mut current = match self.root {
            Some(root) if self.data(root).name == first => root,
            _ => return Err(not_found(first)),
        };

        for segment in segments {
            current = self
                .child_named(current, segment)
                .ok_or_else(|| not_found(segment))?;
        }

        Ok(current)
    }

    /// Resolve a path, reporting absence as `None`
    pub fn try_find(&self, path: &str) -> Option<NodeId> {
        self.find_by_path(path).ok()
    }

    /// Whether a node exists at the path
    pub fn contains(&self, path: &str) -> bool {
        self.try_find(path).is_some()
    }

    /// Search a subtree (or the whole tree) for nodes with a given name
    ///
    /// The subtree root itself is included in the search.
    pub fn find_by_name(&self, name: &str, parent_path: Option<&str>) -> Result<NameMatch, TreeError> {
        let start = match parent_path {
            Some(path) => Some(self.find_by_path(path)?),
            None => self.root,
        };

        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = start.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.data(id);
            if node.name == name {
                found.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }

        Ok(match found.as_slice() {
            [single] => NameMatch::One(*single),
            _ => NameMatch::Many(found),
        })
    }

    fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.data(parent)
            .children
            .iter()
            .copied()
            .find(|c| self.data(*c).name == name)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Add a node under the node at `parent`, or as the new root
    ///
    /// Passing no parent replaces the whole tree with a single root node;
    /// handles issued before that are no longer valid. Attribute keys outside
    /// the tree's vocabulary are dropped, the rest are registered as known
    /// attributes.
    pub fn add_node<I, K, A>(&mut self, name: &str, parent: Option<&str>, attrs: I) -> Result<NodeId, TreeError>
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<String>,
    {
        match parent {
            Some(parent) => {
                let parent_id = self.find_by_path(parent)?;
                self.insert_child(parent_id, name, attrs)
            }
            None => {
                validate_name(name)?;
                let attrs = self.admit(attrs);
                self.nodes.clear();
                let id = self.alloc(name, None, attrs);
                self.root = Some(id);
                Ok(id)
            }
        }
    }

    /// Detach the node at `path` and its subtree
    ///
    /// The detached part is returned as a tree of its own. Detaching the root
    /// leaves this tree empty.
    pub fn delete_node(&mut self, path: &str) -> Result<Tree<V>, TreeError> {
        let id = self.find_by_path(path)?;
        let detached = self.subtree(id);

        match self.nodes[id.0].parent.take() {
            Some(parent) => self.nodes[parent.0].children.retain(|c| *c != id),
            None => self.root = None,
        }

        Ok(detached)
    }

    /// Set or overwrite attributes on the node at `path`
    pub fn update_node<I, K, A>(&mut self, path: &str, attrs: I) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<String>,
    {
        let id = self.find_by_path(path)?;
        let attrs = self.admit(attrs);
        self.nodes[id.0].attrs.extend(attrs);
        Ok(())
    }

    /// Copy of the subtree rooted at `id`, as a tree of its own
    pub fn subtree(&self, id: NodeId) -> Tree<V> {
        let mut out = Tree::new();
        out.known_attrs = self.known_attrs.clone();
        let root = out.copy_branch(self, id, None);
        out.root = Some(root);
        out
    }

    /// Copy another tree under the node at `parent`
    ///
    /// Returns the handle of the copied root, or `None` if `subtree` is empty.
    pub fn graft(&mut self, parent: &str, subtree: &Tree<V>) -> Result<Option<NodeId>, TreeError> {
        let parent_id = self.find_by_path(parent)?;
        let Some(src_root) = subtree.root else {
            return Ok(None);
        };
        self.known_attrs.extend(subtree.known_attrs.iter().cloned());
        let id = self.copy_branch(subtree, src_root, Some(parent_id));
        self.nodes[parent_id.0].children.push(id);
        Ok(Some(id))
    }

    fn insert_child<I, K, A>(&mut self, parent: NodeId, name: &str, attrs: I) -> Result<NodeId, TreeError>
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<String>,
    {
        validate_name(name)?;
        let attrs = self.admit(attrs);
        let id = self.alloc(name, Some(parent), attrs);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    fn alloc(&mut self, name: &str, parent: Option<NodeId>, attrs: Attributes) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            attrs,
        });
        id
    }

    /// Recursively copy `src_id` from `src` into this arena (not linked to the parent's child list)
    fn copy_branch(&mut self, src: &Tree<V>, src_id: NodeId, parent: Option<NodeId>) -> NodeId {
        let node = src.data(src_id);
        let id = self.alloc(&node.name, parent, node.attrs.clone());
        for child in &node.children {
            let copied = self.copy_branch(src, *child, Some(id));
            self.nodes[id.0].children.push(copied);
        }
        id
    }

    fn admit<I, K, A>(&mut self, attrs: I) -> Attributes
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<String>,
    {
        let mut kept = Attributes::new();
        for (key, value) in attrs {
            let key = key.into();
            if RESERVED_KEYS.contains(&key.as_str()) || !V::admits(&key) {
                tracing::debug!(attribute = %key, "attribute outside vocabulary dropped");
                continue;
            }
            self.known_attrs.insert(key.clone());
            kept.insert(key, value.into());
        }
        kept
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    // ------------------------------------------------------------------
    // Comparison and rendering
    // ------------------------------------------------------------------

    /// Compare with another tree, keyed by node path
    ///
    /// Paths only in `other` are `Added`, only in `self` are `Deleted`, and
    /// paths in both whose attributes differ (including an attribute present
    /// on one side only) are `Changed`.
    pub fn diff(&self, other: &Tree<V>) -> BTreeMap<String, Change> {
        let mine = self.path_index();
        let theirs = other.path_index();
        let mut diff = BTreeMap::new();

        for (path, id) in &mine {
            match theirs.get(path) {
                None => {
                    diff.insert(path.clone(), Change::Deleted);
                }
                Some(other_id) => {
                    if self.data(*id).attrs != other.data(*other_id).attrs {
                        diff.insert(path.clone(), Change::Changed);
                    }
                }
            }
        }
        for path in theirs.keys() {
            if !mine.contains_key(path) {
                diff.insert(path.clone(), Change::Added);
            }
        }

        diff
    }

    fn path_index(&self) -> BTreeMap<String, NodeId> {
        let mut index = BTreeMap::new();
        for id in self.preorder() {
            index.entry(self.path_of(id)).or_insert(id);
        }
        index
    }

    /// Directory-style rendering showing the given attributes
    pub fn render_with(&self, attributes: &[&str]) -> String {
        let mut out = String::new();
        let Some(root) = self.root else {
            return out;
        };

        let mut stack: Vec<(NodeId, String, Option<bool>)> = vec![(root, String::new(), None)];
        while let Some((id, prefix, last)) = stack.pop() {
            let node = self.data(id);
            let (branch, child_prefix) = match last {
                None => (String::new(), String::new()),
                Some(true) => (format!("{prefix}└── "), format!("{prefix}    ")),
                Some(false) => (format!("{prefix}├── "), format!("{prefix}│   ")),
            };

            out.push_str(&branch);
            out.push_str(&node.name);
            for key in attributes {
                if let Some(value) = node.attrs.get(*key) {
                    out.push_str(&format!(" {}={}", key, value));
                }
            }
            out.push('\n');

            let count = node.children.len();
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((*child, child_prefix.clone(), Some(i + 1 == count)));
            }
        }

        out
    }
}

impl<V: Vocabulary> PartialEq for Tree<V> {
    fn eq(&self, other: &Self) -> bool {
        self.diff(other).is_empty()
    }
}

impl<V: Vocabulary> Eq for Tree<V> {}

impl<V: Vocabulary> fmt::Display for Tree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.known_attributes().collect();
        f.write_str(&self.render_with(&keys))
    }
}

/// Read-only view of one node
pub struct NodeRef<'a, V: Vocabulary> {
    tree: &'a Tree<V>,
    id: NodeId,
}

impl<V: Vocabulary> Clone for NodeRef<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V: Vocabulary> Copy for NodeRef<'_, V> {}

impl<V: Vocabulary> fmt::Debug for NodeRef<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("path", &self.path())
            .field("attributes", self.attributes())
            .finish()
    }
}

impl<'a, V: Vocabulary> NodeRef<'a, V> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.tree.data(self.id).name
    }

    pub fn attr(&self, key: &str) -> Option<&'a str> {
        self.tree.data(self.id).attrs.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &'a Attributes {
        &self.tree.data(self.id).attrs
    }

    pub fn parent(&self) -> Option<NodeRef<'a, V>> {
        self.tree
            .data(self.id)
            .parent
            .map(|id| NodeRef { tree: self.tree, id })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a, V>> + 'a {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |id| NodeRef { tree, id: *id })
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children().map(|c| c.name().to_string()).collect()
    }

    pub fn has_children(&self) -> bool {
        !self.tree.data(self.id).children.is_empty()
    }

    pub fn path(&self) -> String {
        self.tree.path_of(self.id)
    }

    pub fn depth(&self) -> usize {
        self.tree.depth(self.id)
    }
}

fn validate_name(name: &str) -> Result<(), TreeError> {
    if name.is_empty() || name.contains(PATH_SEPARATOR) {
        return Err(TreeError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Convert descriptor attributes to strings; `null` drops the key
fn scalar_attributes(record: &NodeRecord, entry: &str) -> Result<Vec<(String, String)>, TreeError> {
    let mut attrs = Vec::with_capacity(record.attributes.len());
    for (key, value) in &record.attributes {
        let value = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(TreeError::format(
                    entry,
                    format!("attribute `{}` must be a string, number or boolean", key),
                ))
            }
        };
        attrs.push((key.clone(), value));
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    type Plain = Tree<AnyAttribute>;

    const NO_ATTRS: [(&str, &str); 0] = [];

    fn sample() -> Plain {
        let mut tree = Plain::new();
        tree.add_node("Title", None, [("type", "str"), ("required", "True")])
            .unwrap();
        tree.add_node("Category", Some("Title"), [("inquire", "list")])
            .unwrap();
        tree.add_node("Book", Some("Title/Category"), NO_ATTRS).unwrap();
        tree.add_node("Film", Some("Title/Category"), NO_ATTRS).unwrap();
        tree.add_node("Year", Some("Title"), [("type", "int")]).unwrap();
        tree
    }

    #[test]
    fn test_find_by_path_is_identity_preserving() {
        let tree = sample();
        for id in tree.preorder() {
            assert_eq!(tree.find_by_path(&tree.path_of(id)).unwrap(), id);
        }
    }

    #[test]
    fn test_find_by_path_ignores_outer_slashes() {
        let tree = sample();
        let id = tree.find_by_path("/Title/Category/Film/").unwrap();
        assert_eq!(tree.node(id).name(), "Film");
    }

    #[test]
    fn test_find_by_path_single_segment_must_be_root() {
        let tree = sample();
        let err = tree.find_by_path("Category").unwrap_err();
        match err {
            TreeError::NodeNotFound { segment, .. } => assert_eq!(segment, "Category"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_by_path_names_failing_segment() {
        let tree = sample();
        match tree.find_by_path("Title/Category/Album").unwrap_err() {
            TreeError::NodeNotFound { segment, path } => {
                assert_eq!(segment, "Album");
                assert_eq!(path, "Title/Category/Album");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(tree.try_find("Title/Category/Album").is_none());
    }

    #[test]
    fn test_empty_tree_lookup_fails() {
        let tree = Plain::new();
        assert!(tree.try_find("Title").is_none());
        assert_eq!(tree.find_by_name("Title", None).unwrap(), NameMatch::Many(vec![]));
    }

    #[test]
    fn test_find_by_name_one_and_many() {
        let mut tree = sample();
        tree.add_node("Book", Some("Title"), NO_ATTRS).unwrap();

        match tree.find_by_name("Book", None).unwrap() {
            NameMatch::Many(ids) => assert_eq!(ids.len(), 2),
            other => panic!("expected many, got {other:?}"),
        }
        match tree.find_by_name("Book", Some("Title/Category")).unwrap() {
            NameMatch::One(id) => assert_eq!(tree.path_of(id), "Title/Category/Book"),
            other => panic!("expected one, got {other:?}"),
        }
        assert_eq!(
            tree.find_by_name("Album", None).unwrap(),
            NameMatch::Many(vec![])
        );
    }

    #[test]
    fn test_add_node_rejects_bad_names() {
        let mut tree = sample();
        assert!(matches!(
            tree.add_node("a/b", Some("Title"), NO_ATTRS),
            Err(TreeError::InvalidName(_))
        ));
        assert!(matches!(
            tree.add_node("", Some("Title"), NO_ATTRS),
            Err(TreeError::InvalidName(_))
        ));
    }

    #[test]
    fn test_add_node_with_missing_parent_fails() {
        let mut tree = sample();
        assert!(matches!(
            tree.add_node("X", Some("Title/Nope"), NO_ATTRS),
            Err(TreeError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn test_add_root_replaces_tree() {
        let mut tree = sample();
        tree.add_node("Other", None, NO_ATTRS).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().unwrap().name(), "Other");
    }

    #[test]
    fn test_known_attributes_accumulate() {
        let tree = sample();
        let known: Vec<&str> = tree.known_attributes().collect();
        assert_eq!(known, vec!["inquire", "required", "type"]);
    }

    #[test]
    fn test_reserved_keys_are_not_attributes() {
        let mut tree = Plain::new();
        tree.add_node("Root", None, [("name", "x"), ("parent", "y"), ("note", "z")])
            .unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.attr("note"), Some("z"));
        assert!(root.attr("name").is_none());
        assert!(root.attr("parent").is_none());
    }

    #[test]
    fn test_update_node_sets_attributes() {
        let mut tree = sample();
        tree.update_node("Title", [("value", "Dune")]).unwrap();
        assert_eq!(tree.root().unwrap().attr("value"), Some("Dune"));
        assert!(tree.known_attributes().any(|k| k == "value"));
    }

    #[test]
    fn test_delete_node_detaches_subtree() {
        let mut tree = sample();
        let category = tree.find_by_path("Title/Category").unwrap();
        let detached = tree.delete_node("Title/Category").unwrap();

        assert!(tree.try_find("Title/Category").is_none());
        assert!(tree.try_find("Title/Category/Book").is_none());
        assert_eq!(tree.len(), 2);
        assert!(tree.node(category).parent().is_none());

        assert_eq!(detached.root().unwrap().name(), "Category");
        assert!(detached.contains("Category/Film"));
    }

    #[test]
    fn test_delete_root_empties_tree() {
        let mut tree = sample();
        let detached = tree.delete_node("Title").unwrap();
        assert!(tree.is_empty());
        assert_eq!(detached.len(), 5);
    }

    #[test]
    fn test_graft_copies_subtree() {
        let mut tree = sample();
        let detached = tree.delete_node("Title/Category").unwrap();
        tree.add_node("Kind", Some("Title"), NO_ATTRS).unwrap();
        tree.graft("Title/Kind", &detached).unwrap();
        assert!(tree.contains("Title/Kind/Category/Book"));
    }

    #[test]
    fn test_to_dict_shape() {
        let tree = sample();
        let data = tree.to_dict();
        assert_eq!(data.len(), 3);
        let l1: Vec<_> = data
            .level(1)
            .unwrap()
            .iter()
            .map(|r| (r.name.clone().unwrap(), r.parent.clone().unwrap()))
            .collect();
        assert_eq!(
            l1,
            vec![
                ("Category".to_string(), "Title".to_string()),
                ("Year".to_string(), "Title".to_string())
            ]
        );
        assert_eq!(data.level(2).unwrap()[0].parent.as_deref(), Some("Title/Category"));
        assert!(data.level(0).unwrap()[0].parent.is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let tree = sample();
        let json = tree.to_json().unwrap();
        let back = Plain::from_json(&json).unwrap();
        assert_eq!(back.to_dict(), tree.to_dict());
        assert_eq!(back, tree);
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        let tree = sample();
        tree.write_json(&path).unwrap();

        let back = Plain::from_json(path.to_str().unwrap()).unwrap();
        assert_eq!(back.to_dict(), tree.to_dict());
    }

    #[test]
    fn test_to_json_uses_four_space_indent() {
        let json = sample().to_json().unwrap();
        assert!(json.starts_with("{\n    \"L0\": ["));
    }

    #[test]
    fn test_empty_tree_serializes_to_empty_object() {
        let tree = Plain::new();
        assert_eq!(tree.to_json().unwrap(), "{}");
        assert!(Plain::from_json_str("{}").unwrap().is_empty());
    }

    #[test]
    fn test_from_dict_missing_name() {
        let err = Plain::from_json_str(
            r#"{"L0": [{"name": "R"}], "L1": [{"parent": "R"}]}"#,
        )
        .unwrap_err();
        match err {
            TreeError::Format { entry, reason } => {
                assert_eq!(entry, "L1[0]");
                assert!(reason.contains("name"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_dict_missing_parent() {
        let err = Plain::from_json_str(r#"{"L0": [{"name": "R"}], "L1": [{"name": "A"}]}"#)
            .unwrap_err();
        assert!(matches!(err, TreeError::Format { .. }));
        assert!(err.to_string().contains("parent"));
    }

    #[test]
    fn test_from_dict_unresolved_parent() {
        let err = Plain::from_json_str(
            r#"{"L0": [{"name": "R"}], "L1": [{"name": "A", "parent": "R/B"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TreeError::Format { .. }));
    }

    #[test]
    fn test_from_dict_parent_on_any_lower_level() {
        let tree = Plain::from_json_str(
            r#"{"L0": [{"name": "R"}],
                "L1": [{"name": "A", "parent": "R"}],
                "L2": [{"name": "B", "parent": "R"}]}"#,
        )
        .unwrap();
        assert!(tree.contains("R/A"));
        assert!(tree.contains("R/B"));
        assert_eq!(tree.node(tree.root_id().unwrap()).child_names(), vec!["A", "B"]);
    }

    #[test]
    fn test_from_dict_parent_on_same_level() {
        let err = Plain::from_json_str(
            r#"{"L0": [{"name": "R"}],
                "L1": [{"name": "A", "parent": "R"}, {"name": "B", "parent": "R/A"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TreeError::Format { .. }));
    }

    #[test]
    fn test_from_dict_rejects_level_gap_and_multiple_roots() {
        let gap = Plain::from_json_str(r#"{"L0": [{"name": "R"}], "L2": []}"#).unwrap_err();
        assert!(matches!(gap, TreeError::Format { .. }));

        let two = Plain::from_json_str(r#"{"L0": [{"name": "R"}, {"name": "S"}]}"#).unwrap_err();
        assert!(matches!(two, TreeError::Format { .. }));
    }

    #[test]
    fn test_from_dict_converts_scalars() {
        let tree = Plain::from_json_str(
            r#"{"L0": [{"name": "R", "required": true, "max": 3, "gone": null}]}"#,
        )
        .unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.attr("required"), Some("True"));
        assert_eq!(root.attr("max"), Some("3"));
        assert!(root.attr("gone").is_none());

        let err = Plain::from_json_str(r#"{"L0": [{"name": "R", "list": [1]}]}"#).unwrap_err();
        assert!(matches!(err, TreeError::Format { .. }));
    }

    #[test]
    fn test_diff_reflexive() {
        let tree = sample();
        assert!(tree.diff(&tree).is_empty());
        assert_eq!(tree, tree.clone());
    }

    #[test]
    fn test_diff_added_and_deleted() {
        let tree = sample();
        let mut other = tree.clone();
        other
            .add_node("Music", Some("Title/Category"), NO_ATTRS)
            .unwrap();

        let diff = tree.diff(&other);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff["Title/Category/Music"], Change::Added);

        let mut removed = tree.clone();
        removed.delete_node("Title/Year").unwrap();
        let diff = tree.diff(&removed);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff["Title/Year"], Change::Deleted);
    }

    #[test]
    fn test_diff_attribute_presence_counts() {
        let tree = sample();
        let mut other = tree.clone();
        other.update_node("Title/Year", [("value", "1965")]).unwrap();

        let diff = tree.diff(&other);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff["Title/Year"], Change::Changed);
        assert_ne!(tree, other);
    }

    #[test]
    fn test_render() {
        let tree = sample();
        insta::assert_snapshot!(tree.render_with(&["type", "inquire"]), @r"
        Title type=str
        ├── Category inquire=list
        │   ├── Book
        │   └── Film
        └── Year type=int
        ");
    }
}
