//! Core event types shared by the store and the bubbler.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An event to emit: a name plus a `triggered` marker.
///
/// Plain names convert into untriggered events. Structured events built
/// with [`Event::triggered`] or deserialized from `{"name", "triggered"}`
/// carry the flag explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub triggered: bool,
}

impl Event {
    /// An untriggered event.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            triggered: false,
        }
    }

    /// A triggered event.
    pub fn triggered(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            triggered: true,
        }
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Event::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Event::new(name)
    }
}

impl From<Lifecycle> for Event {
    fn from(lifecycle: Lifecycle) -> Self {
        Event::new(lifecycle.as_str())
    }
}

/// Lifecycle events emitted by the store around mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    PreCreate,
    PreUpdate,
    PreDelete,
    PostCreate,
    PostUpdate,
    PostDelete,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::PreCreate => "pre-create",
            Lifecycle::PreUpdate => "pre-update",
            Lifecycle::PreDelete => "pre-delete",
            Lifecycle::PostCreate => "post-create",
            Lifecycle::PostUpdate => "post-update",
            Lifecycle::PostDelete => "post-delete",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The object found at a path, as reported to listeners.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    /// Leaf entries of the node, or `null` when there is no node.
    pub obj: Value,
    /// The node's type, if it declares one.
    #[serde(rename = "type")]
    pub type_name: Option<String>,
}

impl ObjectState {
    pub fn new(type_name: Option<String>, obj: Value) -> Self {
        Self { obj, type_name }
    }
}

/// Describes the emitting object at the moment of emission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
    pub path: String,
    pub triggered: bool,
    pub obj: Value,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
}

/// What every listener receives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Path the event was emitted at.
    pub path: String,
    /// Event name.
    pub event: String,
    pub source: EventSource,
    /// Extra values passed to `emit`.
    pub extra: Vec<Value>,
}

impl Notification {
    pub fn type_name(&self) -> Option<&str> {
        self.source.type_name.as_deref()
    }
}
