//! Read-side assemblers keyed by object type.
//!
//! An assembler turns the raw JSON rendering of a node into whatever shape
//! callers expect for that type. Nodes without a registered assembler are
//! returned unchanged.

use crate::error::{Result, StoreError};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Transforms a node's raw rendering on read.
pub trait Assembler: Send + Sync {
    fn assemble(&self, type_name: Option<&str>, raw: Value) -> Result<Value>;
}

impl<F> Assembler for F
where
    F: Fn(Option<&str>, Value) -> Result<Value> + Send + Sync,
{
    fn assemble(&self, type_name: Option<&str>, raw: Value) -> Result<Value> {
        self(type_name, raw)
    }
}

/// Returns nodes exactly as stored.
pub struct RawAssembler;

impl Assembler for RawAssembler {
    fn assemble(&self, _type_name: Option<&str>, raw: Value) -> Result<Value> {
        Ok(raw)
    }
}

/// Assemblers by type name, with a fallback for everything else.
pub struct AssemblerRegistry {
    by_type: RwLock<HashMap<String, Arc<dyn Assembler>>>,
    fallback: Arc<dyn Assembler>,
}

impl AssemblerRegistry {
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(RawAssembler))
    }

    pub fn with_fallback(fallback: Arc<dyn Assembler>) -> Self {
        Self {
            by_type: RwLock::new(HashMap::new()),
            fallback,
        }
    }

    /// Register `assembler` for `type_name`, replacing any previous one.
    pub fn register(&self, type_name: &str, assembler: Arc<dyn Assembler>) -> Result<()> {
        if type_name.trim().is_empty() {
            return Err(StoreError::InvalidConfiguration(
                "assembler type name must not be empty".to_string(),
            ));
        }
        self.by_type
            .write()
            .insert(type_name.to_string(), assembler);
        Ok(())
    }

    pub fn unregister(&self, type_name: &str) -> bool {
        self.by_type.write().remove(type_name).is_some()
    }

    /// The assembler for `type_name`, or the fallback.
    pub fn resolve(&self, type_name: Option<&str>) -> Arc<dyn Assembler> {
        type_name
            .and_then(|t| self.by_type.read().get(t).cloned())
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    pub fn len(&self) -> usize {
        self.by_type.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AssemblerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
