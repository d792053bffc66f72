//! # Bubble Tree
//!
//! An in-memory hierarchical namespace where events bubble up the tree.
//!
//! ## Core Concepts
//!
//! - **Nodes**: Addressed by paths like `/users/alice`, holding leaf values
//! - **Auto-vivification**: Writing to a path creates any missing nodes
//! - **Lifecycle events**: `pre-`/`post-` `create`, `update`, `delete` around
//!   every mutation
//! - **Bubbling**: Events emitted at a path reach listeners on every ancestor
//!
//! ## Example
//!
//! ```ignore
//! use bubbletree::{BubbleTree, Filter, SubscribeOptions};
//! use serde_json::json;
//!
//! let tree = BubbleTree::default();
//!
//! // Hear about every user under /users
//! let options = SubscribeOptions::default().with_filter(Filter::types(["user"]));
//! tree.subscribe("/users", options, |n| {
//!     println!("{} {}", n.event, n.path);
//!     Ok(())
//! })?;
//!
//! // Creates /users and /users/alice, then fires pre/post create and update
//! tree.save("/users/alice", "type", json!("user"))?;
//! tree.save("/users/alice", "age", json!(30))?;
//! ```

pub mod assembler;
pub mod bubbler;
pub mod error;
pub mod facade;
pub mod store;
pub mod tree;
pub mod types;

// Re-exports
pub use assembler::{Assembler, AssemblerRegistry, RawAssembler};
pub use bubbler::{
    match_filters, Bubbler, Bus, Callback, ChannelSubscription, Constraint, Detached, Filter,
    SourceLookup, SubscribeOptions, SubscriptionId,
};
pub use error::{Result, StoreError};
pub use facade::{BubbleTree, Read, ReadOptions};
pub use store::{GetOptions, Store, StoreConfig};
pub use tree::{Node, NodePath, ResolvedLocation, SEPARATOR};
pub use types::*;
