//! Taxonopy: records shaped by tree taxonomies
//!
//! A schema is a [`Tree`](core::Tree) whose nodes say what may be asked:
//! a typed value, one choice among the children, or any number of them.
//! Builders walk the schema and keep only the answered branches, giving a
//! record with the same shape. Records live in a small SQLite-backed
//! [`RecordStore`](store::RecordStore) and can be exchanged as flat CSV.

pub mod builder;
pub mod cli;
pub mod core;
pub mod schema;
pub mod store;
