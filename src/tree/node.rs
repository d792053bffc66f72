//! Tree nodes.

use super::path::SEPARATOR;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A node in the namespace tree.
///
/// Leaf values and child nodes live in separate maps. When a node is
/// rendered as JSON, children appear under their name prefixed with the
/// separator (`"/child"`), which is why caller keys may not start with it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    entries: BTreeMap<String, Value>,
    children: BTreeMap<String, Node>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Leaf Entries ---

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Set a leaf value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    // --- Children ---

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.get_mut(name)
    }

    pub fn children(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.children.iter()
    }

    pub(crate) fn children_mut(&mut self) -> &mut BTreeMap<String, Node> {
        &mut self.children
    }

    /// Detach a child subtree.
    pub fn remove_child(&mut self, name: &str) -> Option<Node> {
        self.children.remove(name)
    }

    /// Drop every entry and child.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.children.is_empty()
    }

    // --- Rendering ---

    /// The node's type, read from the string leaf stored under `type_key`.
    pub fn type_name(&self, type_key: &str) -> Option<String> {
        self.entries
            .get(type_key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Render as a JSON object.
    ///
    /// Non-recursive renders only leaf entries. Recursive renders include
    /// every descendant under `"/name"` keys.
    pub fn to_value(&self, recursive: bool) -> Value {
        let mut map = Map::new();
        for (key, value) in &self.entries {
            map.insert(key.clone(), value.clone());
        }
        if recursive {
            for (name, child) in &self.children {
                map.insert(format!("{}{}", SEPARATOR, name), child.to_value(true));
            }
        }
        Value::Object(map)
    }

    /// Count of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(Node::node_count).sum::<usize>()
    }
}
