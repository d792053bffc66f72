//! The namespace tree: paths, nodes, and path resolution.

mod node;
mod path;
mod resolve;

pub use node::Node;
pub use path::{Ancestors, NodePath, SEPARATOR};
pub use resolve::{resolve, resolve_mut, ResolvedLocation};
