//! Event bubbling for the namespace.
//!
//! Listeners subscribe at a path. An event emitted at `/a/b/c` reaches:
//! - direct listeners at `/a/b/c`
//! - bubbling listeners at `/a/b`, `/a`, and `/`, in that order
//!
//! Subscriptions support:
//! - Filtering by object type and event name
//! - Opting out of triggered events
//! - Callback or channel delivery
//!
//! # Example
//!
//! ```ignore
//! let bubbler = Bubbler::new();
//!
//! // Watch every user object under /users
//! let options = SubscribeOptions::default().with_filter(Filter::types(["user"]));
//! let id = bubbler.subscribe("/users", options, |n| {
//!     println!("{} at {}", n.event, n.path);
//!     Ok(())
//! })?;
//!
//! bubbler.emit("/users/alice", "post-update", vec![], &store)?;
//! bubbler.unsubscribe(id);
//! ```

mod filter;
mod manager;
mod types;

pub use filter::{match_filters, Constraint, Filter};
pub use manager::{Bubbler, Callback, Detached, SourceLookup};
pub use types::{Bus, ChannelSubscription, SubscribeOptions, SubscriptionId};
