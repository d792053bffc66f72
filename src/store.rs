//! Main Store struct: the namespace tree plus its bubbler.

use crate::bubbler::{Bubbler, SourceLookup};
use crate::error::{Result, StoreError};
use crate::tree::{resolve, resolve_mut, Node, NodePath, SEPARATOR};
use crate::types::{Event, Lifecycle, ObjectState};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Leaf key holding a node's type name.
    /// Default: "type"
    pub type_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            type_key: "type".to_string(),
        }
    }
}

impl StoreConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidConfiguration(e.to_string()))?;
        if config.type_key.is_empty() || config.type_key.starts_with(SEPARATOR) {
            return Err(StoreError::InvalidConfiguration(format!(
                "type_key {:?} is not a valid key",
                config.type_key
            )));
        }
        Ok(config)
    }
}

/// What to read from a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Read a single leaf. When set, `recursive` is ignored.
    pub key: Option<String>,

    /// Include child subtrees when reading a whole node.
    pub recursive: bool,
}

impl GetOptions {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            recursive: false,
        }
    }

    pub fn node(recursive: bool) -> Self {
        Self {
            key: None,
            recursive,
        }
    }
}

/// The hierarchical store.
///
/// Provides:
/// - Writing leaf values at any path, creating missing nodes
/// - Reading leaves, nodes, or whole subtrees
/// - Deleting keys or subtrees
/// - Lifecycle events around every mutation, bubbled through the tree
///
/// Locks are never held while listeners run, so a listener may call back
/// into the store.
pub struct Store {
    /// Store configuration.
    config: StoreConfig,

    /// Root of the namespace tree.
    tree: RwLock<Node>,

    /// Listener registries.
    bubbler: Bubbler,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            tree: RwLock::new(Node::new()),
            bubbler: Bubbler::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn bubbler(&self) -> &Bubbler {
        &self.bubbler
    }

    // --- Write Operations ---

    /// Set `key` to `value` on the node at `path`.
    ///
    /// Emits `pre-create` (if the node or key is new), `pre-update`, then
    /// writes, then `post-create` (if new) and `post-update`.
    pub fn save(&self, path: &str, key: &str, value: Value) -> Result<()> {
        let path = NodePath::parse(path)?;
        validate_key(key)?;

        let create_mode = {
            let mut tree = self.tree.write();
            let mut location = resolve_mut(&mut tree, &path, true)?;
            location.created() || !location.node_mut().contains_key(key)
        };
        debug!(path = %path, key, create = create_mode, "save");

        let extra = vec![Value::String(key.to_string()), value.clone()];
        if create_mode {
            self.emit_lifecycle(&path, Lifecycle::PreCreate, &extra)?;
        }
        self.emit_lifecycle(&path, Lifecycle::PreUpdate, &extra)?;

        {
            let mut tree = self.tree.write();
            resolve_mut(&mut tree, &path, true)?
                .into_node()
                .insert(key, value);
        }

        if create_mode {
            self.emit_lifecycle(&path, Lifecycle::PostCreate, &extra)?;
        }
        self.emit_lifecycle(&path, Lifecycle::PostUpdate, &extra)
    }

    /// Delete `key` from the node at `path`, or the whole subtree when no
    /// key is given.
    ///
    /// Returns false, without emitting, if `key` is absent. Fails with
    /// `NotFound` if `path` does not resolve. Once `pre-delete` has fired the
    /// delete succeeds, even if a listener removed the target first.
    pub fn delete(&self, path: &str, key: Option<&str>) -> Result<bool> {
        let path = NodePath::parse(path)?;
        match key {
            Some(key) => self.delete_key(&path, key),
            None => self.delete_node(&path),
        }
    }

    fn delete_key(&self, path: &NodePath, key: &str) -> Result<bool> {
        validate_key(key)?;

        let present = {
            let tree = self.tree.read();
            resolve(&tree, path)?.contains_key(key)
        };
        if !present {
            return Ok(false);
        }
        debug!(path = %path, key, "delete key");

        let extra = vec![Value::String(key.to_string())];
        self.emit_lifecycle(path, Lifecycle::PreDelete, &extra)?;
        {
            let mut tree = self.tree.write();
            match resolve_mut(&mut tree, path, false) {
                Ok(location) => {
                    location.into_node().remove(key);
                }
                // A pre-delete listener already removed the node.
                Err(e) if e.is_not_found() => trace!(path = %path, key, "already deleted"),
                Err(e) => return Err(e),
            }
        }
        self.emit_lifecycle(path, Lifecycle::PostDelete, &extra)?;
        Ok(true)
    }

    fn delete_node(&self, path: &NodePath) -> Result<bool> {
        // The node is gone by post-delete, so both events carry this snapshot.
        let snapshot = {
            let tree = self.tree.read();
            self.state_of(resolve(&tree, path)?)
        };
        debug!(path = %path, "delete node");

        self.bubbler.emit_with_source(
            path,
            Lifecycle::PreDelete.into(),
            snapshot.clone(),
            Vec::new(),
        )?;
        {
            let mut tree = self.tree.write();
            match resolve_mut(&mut tree, path, false) {
                Ok(location) => {
                    location.detach();
                }
                Err(e) if e.is_not_found() => trace!(path = %path, "already deleted"),
                Err(e) => return Err(e),
            }
        }
        self.bubbler
            .emit_with_source(path, Lifecycle::PostDelete.into(), snapshot, Vec::new())?;
        Ok(true)
    }

    // --- Read Operations ---

    /// Read a leaf or a node.
    ///
    /// With a key, returns the value or `None` if the key is absent. Without
    /// one, returns the node as a JSON object: leaf entries only, or the
    /// whole subtree when `recursive` is set.
    pub fn get(&self, path: &str, options: &GetOptions) -> Result<Option<Value>> {
        let path = NodePath::parse(path)?;
        let tree = self.tree.read();
        let node = resolve(&tree, &path)?;

        Ok(match &options.key {
            Some(key) => node.get(key).cloned(),
            None => Some(node.to_value(options.recursive)),
        })
    }

    /// Read one leaf value.
    pub fn get_key(&self, path: &str, key: &str) -> Result<Option<Value>> {
        self.get(path, &GetOptions::key(key))
    }

    /// Read a whole node.
    pub fn get_node(&self, path: &str, recursive: bool) -> Result<Value> {
        let path = NodePath::parse(path)?;
        let tree = self.tree.read();
        Ok(resolve(&tree, &path)?.to_value(recursive))
    }

    /// Whether `path` resolves and, if given, `key` is present on it.
    ///
    /// Never fails; malformed paths simply do not exist.
    pub fn exists(&self, path: &str, key: Option<&str>) -> bool {
        let Ok(path) = NodePath::parse(path) else {
            return false;
        };
        let tree = self.tree.read();
        match (resolve(&tree, &path), key) {
            (Err(_), _) => false,
            (Ok(_), None) => true,
            (Ok(node), Some(key)) => node.contains_key(key),
        }
    }

    /// Total number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.tree.read().node_count()
    }

    // --- Events ---

    /// Emit `event` at `path` with the store as the source lookup.
    pub fn emit(&self, path: &str, event: impl Into<Event>, extra: Vec<Value>) -> Result<()> {
        self.bubbler.emit(path, event, extra, self)
    }

    fn emit_lifecycle(&self, path: &NodePath, lifecycle: Lifecycle, extra: &[Value]) -> Result<()> {
        let state = match self.lookup(path) {
            Ok(state) => state,
            Err(e) if e.is_not_found() => ObjectState::default(),
            Err(e) => return Err(e),
        };
        self.bubbler
            .emit_with_source(path, lifecycle.into(), state, extra.to_vec())
    }

    fn state_of(&self, node: &Node) -> ObjectState {
        ObjectState::new(node.type_name(&self.config.type_key), node.to_value(false))
    }
}

impl SourceLookup for Store {
    fn lookup(&self, path: &NodePath) -> Result<ObjectState> {
        let tree = self.tree.read();
        let node = resolve(&tree, path)?;
        Ok(self.state_of(node))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.starts_with(SEPARATOR) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
