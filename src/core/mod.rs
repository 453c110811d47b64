//! Core module - tree model, leveled serialization and configuration

pub mod config;
pub mod level;
pub mod tree;

pub use config::Config;
pub use level::{LeveledData, NodeRecord};
pub use tree::{
    AnyAttribute, Attributes, Change, NameMatch, NodeId, NodeRef, Tree, TreeError, Vocabulary,
};
