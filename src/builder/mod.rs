//! Record builders
//!
//! A builder walks a schema depth-first and produces a record: a tree with
//! the schema's shape holding only the nodes that were answered. The walk is
//! shared; what differs is where answers come from. [`RecordBuilder`] asks a
//! [`Prompter`], [`FlatRecordBuilder`] reads a flat row keyed by column
//! title.

pub mod flat;
pub mod interactive;
pub mod prompt;
mod walk;

use miette::Diagnostic;
use thiserror::Error;

use crate::core::tree::TreeError;
use crate::schema::{SchemaNode, TypeError};

pub use flat::{FlatRecordBuilder, FlatRow};
pub use interactive::RecordBuilder;
pub use prompt::{PromptError, Prompter, TermPrompter};

/// Errors raised while building a record
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("invalid entry for '{node}' ({path}): {reason}")]
    #[diagnostic(code(taxonopy::build::validation))]
    Validation {
        node: String,
        path: String,
        reason: String,
    },

    #[error("node '{path}' uses unknown value type '{type_name}'")]
    #[diagnostic(
        code(taxonopy::build::unknown_type),
        help("built-in types are str, int, float, bool, datetime.date and datetime.datetime")
    )]
    UnknownType { path: String, type_name: String },

    #[error("record building cancelled")]
    #[diagnostic(code(taxonopy::build::cancelled))]
    Cancelled,

    #[error("prompt failed: {0}")]
    #[diagnostic(code(taxonopy::build::prompt))]
    Prompt(#[source] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tree(#[from] TreeError),
}

impl BuildError {
    pub(crate) fn invalid(node: SchemaNode<'_>, reason: impl Into<String>) -> Self {
        BuildError::Validation {
            node: node.name().to_string(),
            path: node.path(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_type(node: SchemaNode<'_>, err: TypeError) -> Self {
        let TypeError::Unknown(type_name) = err;
        BuildError::UnknownType {
            path: node.path(),
            type_name,
        }
    }
}

impl From<PromptError> for BuildError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Cancelled => BuildError::Cancelled,
            PromptError::Io(e) => BuildError::Prompt(e),
        }
    }
}
