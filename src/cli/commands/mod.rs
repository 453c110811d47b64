//! Command implementations

pub mod completions;
pub mod db;
pub mod schema;
