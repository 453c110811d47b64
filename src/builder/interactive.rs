//! Interactive record builder

use crate::builder::prompt::Prompter;
use crate::builder::walk::{AnswerSource, Walker};
use crate::builder::BuildError;
use crate::schema::{NodeAttributes, SchemaNode, SchemaTree, TypeRegistry};

/// Builds records by prompting for every decision in a schema
pub struct RecordBuilder<'s> {
    schema: &'s SchemaTree,
    types: TypeRegistry,
}

impl<'s> RecordBuilder<'s> {
    pub fn new(schema: &'s SchemaTree) -> Self {
        Self {
            schema,
            types: TypeRegistry::default(),
        }
    }

    /// Use a custom type registry
    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    /// Build a record
    ///
    /// With both `existing` and `node_path`, only the node at `node_path` is
    /// asked again: the rest of `existing` is kept as is. With only
    /// `existing`, the whole schema is walked using its values as defaults.
    /// Nothing is written anywhere; a cancelled build just returns
    /// [`BuildError::Cancelled`].
    pub fn build<P: Prompter>(
        &self,
        prompter: &mut P,
        existing: Option<&SchemaTree>,
        node_path: Option<&str>,
    ) -> Result<SchemaTree, BuildError> {
        let walker = match (existing, node_path) {
            (Some(existing), Some(path)) => self.scoped_walker(existing, path)?,
            _ => Walker::full(self.schema)?,
        };

        let mut answers = PromptAnswers {
            prompter,
            types: &self.types,
            existing,
        };
        walker.run(&mut answers)
    }

    fn scoped_walker(&self, existing: &SchemaTree, path: &str) -> Result<Walker<'s>, BuildError> {
        let target = self.schema.find_by_path(path)?;
        let target_node = self.schema.node(target);

        let mut record = existing.clone();
        let previous = match record.try_find(path) {
            Some(_) => Some(record.delete_node(path)?),
            None => None,
        };

        if let Some(parent) = target_node.parent() {
            if !record.contains(&parent.path()) {
                return Err(BuildError::invalid(
                    target_node,
                    format!("record has no '{}' to edit under", parent.path()),
                ));
            }
        }

        tracing::debug!(node = %path, "re-editing one node");
        let previous = previous.filter(|_| NodeAttributes::of(target_node).is_typed());
        Ok(Walker::scoped(self.schema, record, target, previous))
    }
}

struct PromptAnswers<'a, P> {
    prompter: &'a mut P,
    types: &'a TypeRegistry,
    existing: Option<&'a SchemaTree>,
}

impl<P: Prompter> PromptAnswers<'_, P> {
    fn existing_node(&self, path: &str) -> Option<SchemaNode<'_>> {
        let existing = self.existing?;
        existing.try_find(path).map(|id| existing.node(id))
    }
}

impl<P: Prompter> AnswerSource for PromptAnswers<'_, P> {
    fn typed_value(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
    ) -> Result<Option<String>, BuildError> {
        let type_name = attrs.type_name.unwrap_or("str");
        let mut message = format!("{} [{}]", node.name(), type_name);
        if attrs.required {
            message.push_str(" (required)");
        }

        let default = self
            .existing_node(&node.path())
            .and_then(|n| n.attr("value"))
            .or(attrs.default)
            .map(str::to_string);

        loop {
            let entered = self.prompter.ask_text(&message, default.as_deref())?;

            if entered.trim().is_empty() {
                if attrs.required {
                    continue;
                }
                return Ok(None);
            }

            let accepted = self
                .types
                .accepts(type_name, attrs.import, &entered)
                .map_err(|e| BuildError::unknown_type(node, e))?;
            if accepted {
                return Ok(Some(entered));
            }
            self.prompter.warn(&format!(
                "Given value is not compatible with type '{}'",
                TypeRegistry::qualify(type_name, attrs.import)
            ));
        }
    }

    fn choose_one(
        &mut self,
        node: SchemaNode<'_>,
        _attrs: &NodeAttributes<'_>,
        choices: &[String],
        required: bool,
    ) -> Result<Option<String>, BuildError> {
        let path = node.path();
        let previous: Option<String> = self
            .existing_node(&path)
            .and_then(|n| n.children().next().map(|c| c.name().to_string()));

        if !required {
            let had_it = self.existing_node(&path).is_some();
            let yes_no = ["yes".to_string(), "no".to_string()];
            let answer = self.prompter.ask_single_choice(
                &format!("Add {}?", node.name()),
                &yes_no,
                Some(if had_it { "yes" } else { "no" }),
            )?;
            if answer != "yes" {
                return Ok(None);
            }
        }

        let default = previous.filter(|p| choices.contains(p));
        let choice = self
            .prompter
            .ask_single_choice(node.name(), choices, default.as_deref())?;
        Ok(Some(choice))
    }

    fn choose_many(
        &mut self,
        node: SchemaNode<'_>,
        attrs: &NodeAttributes<'_>,
        choices: &[String],
    ) -> Result<Vec<String>, BuildError> {
        let message = if attrs.required {
            format!("{} (select at least one)", node.name())
        } else {
            node.name().to_string()
        };

        let defaults: Vec<String> = self
            .existing_node(&node.path())
            .map(|n| {
                n.child_names()
                    .into_iter()
                    .filter(|c| choices.contains(c))
                    .collect()
            })
            .unwrap_or_default();

        loop {
            let picked = self.prompter.ask_multi_choice(&message, choices, &defaults)?;
            if !picked.is_empty() || !attrs.required {
                return Ok(picked);
            }
        }
    }
}
