//! Subscription filters.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single name or a set of names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constraint {
    One(String),
    Any(Vec<String>),
}

impl Constraint {
    /// An empty set places no constraint. A missing value only satisfies
    /// an empty set.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Constraint::One(name) => value == Some(name.as_str()),
            Constraint::Any(names) => {
                names.is_empty() || value.is_some_and(|v| names.iter().any(|n| n == v))
            }
        }
    }
}

impl From<&str> for Constraint {
    fn from(name: &str) -> Self {
        Constraint::One(name.to_string())
    }
}

impl From<Vec<String>> for Constraint {
    fn from(names: Vec<String>) -> Self {
        Constraint::Any(names)
    }
}

/// Filter criteria for a subscription.
///
/// `types` is checked against the source object's type, `names` against
/// the event name. Absent constraints pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Constraint>,
}

impl Filter {
    /// Match only objects of the given types.
    pub fn types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: Some(Constraint::Any(types.into_iter().map(Into::into).collect())),
            names: None,
        }
    }

    /// Match only the given event names.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: None,
            names: Some(Constraint::Any(names.into_iter().map(Into::into).collect())),
        }
    }

    /// Add an event-name constraint to this filter.
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(Constraint::Any(names.into_iter().map(Into::into).collect()));
        self
    }

    pub fn matches(&self, event_name: &str, type_name: Option<&str>) -> bool {
        let types_ok = self.types.as_ref().map_or(true, |c| c.matches(type_name));
        let names_ok = self
            .names
            .as_ref()
            .map_or(true, |c| c.matches(Some(event_name)));
        types_ok && names_ok
    }

    /// Parse a filter from JSON.
    ///
    /// `types` and `names` must each be a string or a list of strings.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| StoreError::InvalidFilter(e.to_string()))
    }

    /// Parse either a single filter object or a list of them.
    pub fn parse_many(value: &Value) -> Result<Vec<Self>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.iter().map(Self::from_value).collect(),
            Value::Object(_) => Ok(vec![Self::from_value(value)?]),
            other => Err(StoreError::InvalidFilter(format!(
                "expected a filter object or a list of filters, got {}",
                other
            ))),
        }
    }
}

/// True if every filter matches.
pub fn match_filters(event_name: &str, type_name: Option<&str>, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(event_name, type_name))
}
