//! Caller-facing entry point tying the store, bubbler, and assemblers
//! together.

use crate::assembler::{Assembler, AssemblerRegistry};
use crate::bubbler::{Callback, SubscribeOptions, SubscriptionId};
use crate::error::Result;
use crate::store::{Store, StoreConfig};
use crate::types::{Event, Notification};
use serde_json::Value;
use std::sync::Arc;

/// Options for [`BubbleTree::get`].
#[derive(Clone, Default)]
pub struct ReadOptions {
    /// Read one leaf instead of the whole node.
    pub key: Option<String>,

    /// Include child subtrees. Also the `bubble` flag for `callback`.
    pub recursive: bool,

    /// Use this assembler instead of the one registered for the type.
    pub assembler: Option<Arc<dyn Assembler>>,

    /// Treat the node as this type instead of its declared one.
    pub type_name: Option<String>,

    /// Subscribe this callback at the path as part of the read.
    pub callback: Option<Callback>,
}

impl ReadOptions {
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ..Default::default()
        }
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Notification) -> Result<()> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }
}

/// Result of [`BubbleTree::get`].
#[derive(Clone, Debug, PartialEq)]
pub struct Read {
    /// The value read, or `None` for an absent key (or a missing path when
    /// a callback was supplied).
    pub value: Option<Value>,

    /// The subscription made for the read's callback.
    pub subscription: Option<SubscriptionId>,
}

/// The namespace as callers see it.
pub struct BubbleTree {
    store: Store,
    assemblers: AssemblerRegistry,
}

impl BubbleTree {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            store: Store::new(config),
            assemblers: AssemblerRegistry::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn assemblers(&self) -> &AssemblerRegistry {
        &self.assemblers
    }

    pub fn register_assembler(&self, type_name: &str, assembler: Arc<dyn Assembler>) -> Result<()> {
        self.assemblers.register(type_name, assembler)
    }

    // --- Data ---

    pub fn save(&self, path: &str, key: &str, value: Value) -> Result<()> {
        self.store.save(path, key, value)
    }

    /// Read from `path`, optionally subscribing a callback there.
    ///
    /// Whole-node reads go through the assembler for the node's type. With a
    /// callback, a missing path is not an error: the subscription is still
    /// made and `value` is `None`.
    pub fn get(&self, path: &str, options: ReadOptions) -> Result<Read> {
        let value = match self.read(path, &options) {
            Ok(value) => value,
            Err(e) if e.is_not_found() && options.callback.is_some() => None,
            Err(e) => return Err(e),
        };

        let subscription = match options.callback {
            Some(callback) => {
                let subscribe = SubscribeOptions {
                    bubble: options.recursive,
                    ..Default::default()
                };
                Some(
                    self.store
                        .bubbler()
                        .subscribe_callback(path, subscribe, callback)?,
                )
            }
            None => None,
        };

        Ok(Read {
            value,
            subscription,
        })
    }

    fn read(&self, path: &str, options: &ReadOptions) -> Result<Option<Value>> {
        if let Some(key) = &options.key {
            return self.store.get_key(path, key);
        }

        let raw = self.store.get_node(path, options.recursive)?;
        let type_name = options.type_name.clone().or_else(|| {
            raw.get(&self.store.config().type_key)
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        let assembler = match &options.assembler {
            Some(assembler) => Arc::clone(assembler),
            None => self.assemblers.resolve(type_name.as_deref()),
        };
        assembler.assemble(type_name.as_deref(), raw).map(Some)
    }

    pub fn delete(&self, path: &str, key: Option<&str>) -> Result<bool> {
        self.store.delete(path, key)
    }

    pub fn exists(&self, path: &str, key: Option<&str>) -> bool {
        self.store.exists(path, key)
    }

    // --- Events ---

    pub fn subscribe<F>(
        &self,
        path: &str,
        options: SubscribeOptions,
        callback: F,
    ) -> Result<SubscriptionId>
    where
        F: Fn(&Notification) -> Result<()> + Send + Sync + 'static,
    {
        self.store.bubbler().subscribe(path, options, callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store.bubbler().unsubscribe(id)
    }

    pub fn clear_subscriptions(&self, path: &str) -> Result<usize> {
        self.store.bubbler().clear_subscriptions(path)
    }

    pub fn emit(&self, path: &str, event: impl Into<Event>, extra: Vec<Value>) -> Result<()> {
        self.store.emit(path, event, extra)
    }
}

impl Default for BubbleTree {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
