//! Schema walk shared by the builders

use std::collections::BTreeSet;

use crate::builder::BuildError;
use crate::core::tree::NodeId;
use crate::schema::{Inquire, NodeAttributes, SchemaNode, SchemaTree};

/// Where a walk gets its answers from
pub(crate) trait AnswerSource {
    /// Value for a typed node, or `None` to leave the node out
    fn typed_value(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
    ) -> Result<Option<String>, BuildError>;

    /// One child name of a list header, or `None` to leave the group out
    ///
    /// When `required` is set the source must answer or fail.
    fn choose_one(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
        choices: &[String],
        required: bool,
    ) -> Result<Option<String>, BuildError>;

    /// Any number of child names of a checkbox header
    fn choose_many(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
        choices: &[String],
    ) -> Result<Vec<String>, BuildError>;
}

/// Walk state: the record under construction and a stack of pending sibling groups
pub(crate) struct Walker<'s> {
    schema: &'s SchemaTree,
    record: SchemaTree,
    frames: Vec<std::vec::IntoIter<NodeId>>,
    reattach: Option<(NodeId, SchemaTree)>,
}

impl<'s> Walker<'s> {
    /// Walk the whole schema into an empty record
    pub fn full(schema: &'s SchemaTree) -> Result<Self, BuildError> {
        let root = schema.root_id().ok_or(crate::core::TreeError::EmptyTree)?;
        Ok(Self {
            schema,
            record: SchemaTree::new(),
            frames: vec![vec![root].into_iter()],
            reattach: None,
        })
    }

    /// Walk one schema node into an existing record
    ///
    /// If the target is a typed node, `previous` holds the subtree it had in
    /// the record; its children are put back once a value is accepted.
    pub fn scoped(
        schema: &'s SchemaTree,
        record: SchemaTree,
        target: NodeId,
        previous: Option<SchemaTree>,
    ) -> Self {
        Self {
            schema,
            record,
            frames: vec![vec![target].into_iter()],
            reattach: previous.map(|tree| (target, tree)),
        }
    }

    pub fn run<A: AnswerSource>(mut self, answers: &mut A) -> Result<SchemaTree, BuildError> {
        while let Some(id) = self.next_node() {
            self.visit(id, answers)?;
        }
        if self.record.is_empty() {
            if let Some(root) = self.schema.root() {
                return Err(BuildError::invalid(root, "no value for the root, so the record is empty"));
            }
        }
        Ok(self.record)
    }

    fn next_node(&mut self) -> Option<NodeId> {
        while let Some(top) = self.frames.last_mut() {
            if let Some(id) = top.next() {
                return Some(id);
            }
            self.frames.pop();
        }
        None
    }

    fn visit<A: AnswerSource>(&mut self, id: NodeId, answers: &mut A) -> Result<(), BuildError> {
        let node = self.schema.node(id);
        let attrs = NodeAttributes::of(node);
        tracing::debug!(node = %node.path(), "visiting");

        if attrs.is_typed() {
            let filled = self.fill_typed(node, &attrs, answers)?;
            if filled && self.reattach_children(id)? {
                return Ok(());
            }
            // Value presence gates descent
            if !filled || !node.has_children() {
                return Ok(());
            }
        }

        match attrs.inquire {
            Some(Inquire::List) => self.select_one(node, &attrs, answers),
            Some(Inquire::Checkbox) => self.select_many(node, &attrs, answers),
            None => {
                self.copy(node, None)?;
                self.push(node.children().map(|c| c.id()).collect());
                Ok(())
            }
        }
    }

    /// Obtain a value for a typed node and store it; returns whether the node now has one
    fn fill_typed<A: AnswerSource>(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
        answers: &mut A,
    ) -> Result<bool, BuildError> {
        let path = node.path();
        if let Some(existing) = self.record.try_find(&path) {
            if self.record.node(existing).attr("value").is_some() {
                return Ok(true);
            }
        }

        let Some(value) = answers.typed_value(node, attrs)? else {
            return Ok(false);
        };
        tracing::debug!(node = %path, value = %value, "value accepted");

        if self.record.contains(&path) {
            self.record.update_node(&path, [("value", value)])?;
        } else {
            self.copy(node, Some(&value))?;
        }
        Ok(true)
    }

    fn select_one<A: AnswerSource>(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
        answers: &mut A,
    ) -> Result<(), BuildError> {
        // A header already in the record can't be declined
        let required = attrs.required || self.record.contains(&node.path());
        let choices = Self::options(node)?;

        let Some(choice) = answers.choose_one(node, attrs, &choices, required)? else {
            tracing::debug!(node = %node.path(), "optional group left out");
            return Ok(());
        };
        let chosen = node
            .children()
            .find(|c| c.name() == choice)
            .ok_or_else(|| {
                BuildError::invalid(
                    node,
                    format!("'{}' is not one of: {}", choice, choices.join(", ")),
                )
            })?;

        self.copy(node, None)?;

        let chosen_attrs = NodeAttributes::of(chosen);
        let filled = !chosen_attrs.is_typed() || self.fill_typed(chosen, &chosen_attrs, answers)?;
        self.copy(chosen, None)?;

        if !filled || !chosen.has_children() {
            return Ok(());
        }
        if chosen_attrs.is_header() {
            self.push(vec![chosen.id()]);
        } else {
            self.push(chosen.children().map(|c| c.id()).collect());
        }
        Ok(())
    }

    fn select_many<A: AnswerSource>(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
        answers: &mut A,
    ) -> Result<(), BuildError> {
        let choices = Self::options(node)?;
        let picked: BTreeSet<String> = answers.choose_many(node, attrs, &choices)?.into_iter().collect();

        if let Some(bad) = picked.iter().find(|p| !choices.contains(p)) {
            return Err(BuildError::invalid(
                node,
                format!("'{}' is not one of: {}", bad, choices.join(", ")),
            ));
        }
        if picked.is_empty() {
            if attrs.required {
                return Err(BuildError::invalid(node, "at least one choice is required"));
            }
            return Ok(());
        }

        self.copy(node, None)?;

        // Schema order, whatever order the answers came in
        let mut queued = Vec::new();
        for child in node.children().filter(|c| picked.contains(c.name())) {
            let child_attrs = NodeAttributes::of(child);
            let filled = !child_attrs.is_typed() || self.fill_typed(child, &child_attrs, answers)?;
            if filled && child.has_children() {
                queued.push(child.id());
            }
            self.copy(child, None)?;
        }

        self.push(queued);
        Ok(())
    }

    /// Child names of a choice header, which must offer at least one
    fn options(node: SchemaNode<'_>) -> Result<Vec<String>, BuildError> {
        let choices = node.child_names();
        if choices.is_empty() {
            return Err(BuildError::invalid(node, "has no options to choose from"));
        }
        Ok(choices)
    }

    /// Put a re-edited node's previous children back; returns whether it did
    fn reattach_children(&mut self, id: NodeId) -> Result<bool, BuildError> {
        let Some((target, previous)) = self.reattach.take() else {
            return Ok(false);
        };
        if target != id {
            self.reattach = Some((target, previous));
            return Ok(false);
        }

        let path = self.schema.path_of(id);
        let Some(old) = previous.root() else {
            return Ok(false);
        };
        if !old.has_children() {
            return Ok(false);
        }
        for child in old.children() {
            self.record.graft(&path, &previous.subtree(child.id()))?;
        }
        tracing::debug!(node = %path, "previous children reattached");
        Ok(true)
    }

    /// Insert a schema node into the record unless its path is already there
    fn copy(&mut self, node: SchemaNode<'_>, value: Option<&str>) -> Result<(), BuildError> {
        let path = node.path();
        if self.record.contains(&path) {
            return Ok(());
        }

        let mut attrs = node.attributes().clone();
        if let Some(value) = value {
            attrs.insert("value".to_string(), value.to_string());
        }

        match node.parent() {
            None => {
                self.record.add_node(node.name(), None, attrs)?;
            }
            Some(parent) => {
                let parent_path = parent.path();
                if !self.record.contains(&parent_path) {
                    return Err(BuildError::invalid(
                        node,
                        format!("parent '{}' is not part of the record", parent_path),
                    ));
                }
                self.record.add_node(node.name(), Some(&parent_path), attrs)?;
            }
        }
        Ok(())
    }

    fn push(&mut self, ids: Vec<NodeId>) {
        if !ids.is_empty() {
            self.frames.push(ids.into_iter());
        }
    }
}
