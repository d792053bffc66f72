//! Path resolution against a node tree.

use super::node::Node;
use super::path::NodePath;
use crate::error::{Result, StoreError};
use std::collections::btree_map::Entry;

/// Where a resolved path lives in the tree.
enum Slot<'a> {
    Root(&'a mut Node),
    Child { parent: &'a mut Node, name: String },
}

/// The outcome of a mutable resolution.
///
/// Holds the immediate parent of the final segment (nothing for the root),
/// the final segment name, and whether any node was created on the way.
pub struct ResolvedLocation<'a> {
    slot: Slot<'a>,
    created: bool,
}

impl<'a> ResolvedLocation<'a> {
    /// True if resolution created at least one node.
    pub fn created(&self) -> bool {
        self.created
    }

    /// The final segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        match &self.slot {
            Slot::Root(_) => None,
            Slot::Child { name, .. } => Some(name.as_str()),
        }
    }

    /// The parent node, or `None` for the root.
    pub fn parent(&self) -> Option<&Node> {
        match &self.slot {
            Slot::Root(_) => None,
            Slot::Child { parent, .. } => Some(&**parent),
        }
    }

    /// The resolved node.
    pub fn node_mut(&mut self) -> &mut Node {
        match &mut self.slot {
            Slot::Root(node) => &mut **node,
            Slot::Child { parent, name } => {
                parent.children_mut().entry(name.clone()).or_default()
            }
        }
    }

    pub fn into_node(self) -> &'a mut Node {
        match self.slot {
            Slot::Root(node) => node,
            Slot::Child { parent, name } => parent.children_mut().entry(name).or_default(),
        }
    }

    /// Remove the resolved node from its parent and return it.
    ///
    /// The root cannot be detached; it is emptied in place instead.
    pub fn detach(self) -> Node {
        match self.slot {
            Slot::Root(node) => std::mem::take(node),
            Slot::Child { parent, name } => parent.remove_child(&name).unwrap_or_default(),
        }
    }
}

/// Step from `node` into its child `segment`, creating it when allowed.
fn descend<'a>(
    node: &'a mut Node,
    segment: &str,
    create: bool,
    created: &mut bool,
) -> Option<&'a mut Node> {
    match node.children_mut().entry(segment.to_string()) {
        Entry::Occupied(entry) => Some(entry.into_mut()),
        Entry::Vacant(entry) => {
            if !create {
                return None;
            }
            *created = true;
            Some(entry.insert(Node::new()))
        }
    }
}

/// Resolve `path` for mutation.
///
/// Missing nodes are created when `create_if_missing` is set; otherwise a
/// missing node fails with [`StoreError::NotFound`].
pub fn resolve_mut<'a>(
    root: &'a mut Node,
    path: &NodePath,
    create_if_missing: bool,
) -> Result<ResolvedLocation<'a>> {
    let Some((last, init)) = path.segments().split_last() else {
        return Ok(ResolvedLocation {
            slot: Slot::Root(root),
            created: false,
        });
    };

    let mut created = false;
    let mut current = root;
    for segment in init {
        current = descend(current, segment, create_if_missing, &mut created)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
    }

    if current.child(last).is_none() {
        if !create_if_missing {
            return Err(StoreError::NotFound(path.to_string()));
        }
        current.children_mut().insert(last.clone(), Node::new());
        created = true;
    }

    Ok(ResolvedLocation {
        slot: Slot::Child {
            parent: current,
            name: last.clone(),
        },
        created,
    })
}

/// Resolve `path` read-only. Never creates.
pub fn resolve<'a>(root: &'a Node, path: &NodePath) -> Result<&'a Node> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| node.child(segment))
        .ok_or_else(|| StoreError::NotFound(path.to_string()))
}
