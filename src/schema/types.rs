//! Value type registry
//!
//! A typed schema node names its value type with the `type` attribute and,
//! optionally, a namespace with `import` (`type=date import=datetime`
//! resolves to `datetime.date`). Types are looked up in a fixed registry of
//! validator functions; new types are added with [`TypeRegistry::register`].

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use miette::Diagnostic;
use thiserror::Error;

/// Checks whether a text value converts to a type
pub type Validator = fn(&str) -> bool;

#[derive(Debug, Error, Diagnostic)]
pub enum TypeError {
    #[error("unknown value type '{0}'")]
    #[diagnostic(
        code(taxonopy::types::unknown),
        help("built-in types are str, int, float, bool, datetime.date and datetime.datetime")
    )]
    Unknown(String),
}

/// Registry of value types keyed by their qualified name
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    validators: HashMap<String, Validator>,
}

impl TypeRegistry {
    /// Registry with no types at all
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Add or replace a type
    pub fn register(&mut self, name: impl Into<String>, validator: Validator) -> &mut Self {
        self.validators.insert(name.into(), validator);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Qualified type name for a node's `type` and `import` attributes
    pub fn qualify(type_name: &str, import: Option<&str>) -> String {
        match import {
            Some(ns) if !type_name.starts_with(&format!("{ns}.")) => format!("{ns}.{type_name}"),
            _ => type_name.to_string(),
        }
    }

    /// Check a value against a type
    pub fn accepts(&self, type_name: &str, import: Option<&str>, value: &str) -> Result<bool, TypeError> {
        let qualified = Self::qualify(type_name, import);
        let validator = self
            .validators
            .get(&qualified)
            .ok_or_else(|| TypeError::Unknown(qualified.clone()))?;
        Ok(validator(value))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("str", |_| true)
            .register("int", |v| v.trim().parse::<i64>().is_ok())
            .register("float", |v| v.trim().parse::<f64>().is_ok())
            .register("bool", is_bool)
            .register("datetime.date", |v| {
                NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").is_ok()
            })
            .register("datetime.datetime", is_datetime);
        registry
    }
}

fn is_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "1" | "0"
    )
}

fn is_datetime(value: &str) -> bool {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").is_ok()
}
