//! The bubbler: path-keyed listener registries and upward dispatch.

use crate::error::Result;
use crate::tree::NodePath;
use crate::types::{Event, EventSource, Notification, ObjectState};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use super::filter::{match_filters, Filter};
use super::types::{Bus, ChannelSubscription, SubscribeOptions, SubscriptionId};

/// Event name whose two extra values describe the deleted object.
const DELETE_EVENT: &str = "delete";

/// A listener callback. Errors abort the dispatch and reach the emitter.
pub type Callback = Arc<dyn Fn(&Notification) -> Result<()> + Send + Sync>;

/// Looks up the current object at a path when building event sources.
pub trait SourceLookup {
    /// Fails with `NotFound` when nothing lives at `path`.
    fn lookup(&self, path: &NodePath) -> Result<ObjectState>;
}

/// A lookup for emitters with no backing tree; every path is empty.
pub struct Detached;

impl SourceLookup for Detached {
    fn lookup(&self, _path: &NodePath) -> Result<ObjectState> {
        Ok(ObjectState::default())
    }
}

/// Where a listener delivers its notifications.
enum Sink {
    Callback(Callback),
    Channel(Sender<Notification>),
}

/// A registered listener.
struct Listener {
    id: SubscriptionId,
    filters: Vec<Filter>,
    triggered: bool,
    sink: Sink,
}

impl Listener {
    fn accepts(&self, notification: &Notification) -> bool {
        let filters_ok = self.filters.is_empty()
            || match_filters(
                &notification.event,
                notification.type_name(),
                &self.filters,
            );
        filters_ok && (self.triggered || !notification.source.triggered)
    }
}

/// Bookkeeping for a live subscription.
struct Subscription {
    path: String,
    bubble: bool,
}

#[derive(Default)]
struct Registry {
    direct: HashMap<String, Vec<Arc<Listener>>>,
    bubble: HashMap<String, Vec<Arc<Listener>>>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
}

impl Registry {
    fn bus(&self, bus: Bus) -> &HashMap<String, Vec<Arc<Listener>>> {
        match bus {
            Bus::Direct => &self.direct,
            Bus::Bubble => &self.bubble,
        }
    }

    fn bus_mut(&mut self, bus: Bus) -> &mut HashMap<String, Vec<Arc<Listener>>> {
        match bus {
            Bus::Direct => &mut self.direct,
            Bus::Bubble => &mut self.bubble,
        }
    }

    fn remove_listener(&mut self, bus: Bus, path: &str, id: SubscriptionId) {
        let listeners = self.bus_mut(bus);
        if let Some(list) = listeners.get_mut(path) {
            list.retain(|l| l.id != id);
            if list.is_empty() {
                listeners.remove(path);
            }
        }
    }
}

/// Dual-bus event dispatcher.
///
/// Every subscription lands on the direct bus at its path; bubbling
/// subscriptions also land on the bubble bus. An emit dispatches the direct
/// bus at the origin, then the bubble bus at each ancestor up to the root.
///
/// No lock is held while a listener runs, so listeners may subscribe,
/// unsubscribe, or emit again from inside a dispatch.
pub struct Bubbler {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

impl Bubbler {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            next_id: AtomicU64::new(1),
        }
    }

    // --- Subscriptions ---

    /// Subscribe `callback` at `path`.
    pub fn subscribe<F>(
        &self,
        path: &str,
        options: SubscribeOptions,
        callback: F,
    ) -> Result<SubscriptionId>
    where
        F: Fn(&Notification) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe_callback(path, options, Arc::new(callback))
    }

    /// Subscribe an already shared callback.
    pub fn subscribe_callback(
        &self,
        path: &str,
        options: SubscribeOptions,
        callback: Callback,
    ) -> Result<SubscriptionId> {
        self.register(path, options, Sink::Callback(callback))
    }

    /// Subscribe with a channel instead of a callback.
    ///
    /// Dropping the receiver ends the subscription at the next dispatch
    /// that reaches it.
    pub fn subscribe_channel(
        &self,
        path: &str,
        options: SubscribeOptions,
    ) -> Result<ChannelSubscription> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let id = self.register(path, options, Sink::Channel(sender))?;
        Ok(ChannelSubscription { id, receiver })
    }

    fn register(
        &self,
        path: &str,
        options: SubscribeOptions,
        sink: Sink,
    ) -> Result<SubscriptionId> {
        let key = NodePath::parse(path)?.to_string();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));

        let listener = Arc::new(Listener {
            id,
            filters: options.filters,
            triggered: options.triggered,
            sink,
        });

        let mut registry = self.registry.lock();
        registry
            .direct
            .entry(key.clone())
            .or_default()
            .push(Arc::clone(&listener));
        if options.bubble {
            registry
                .bubble
                .entry(key.clone())
                .or_default()
                .push(listener);
        }
        registry.subscriptions.insert(
            id,
            Subscription {
                path: key.clone(),
                bubble: options.bubble,
            },
        );

        debug!(%id, path = %key, bubble = options.bubble, "subscribed");
        Ok(id)
    }

    /// Remove one subscription from both buses. Returns false if unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock();
        let Some(subscription) = registry.subscriptions.remove(&id) else {
            return false;
        };

        registry.remove_listener(Bus::Direct, &subscription.path, id);
        if subscription.bubble {
            registry.remove_listener(Bus::Bubble, &subscription.path, id);
        }

        debug!(%id, path = %subscription.path, "unsubscribed");
        true
    }

    /// Remove every subscription registered exactly at `path`.
    ///
    /// Ancestors and descendants are untouched. Returns how many
    /// subscriptions were removed.
    pub fn clear_subscriptions(&self, path: &str) -> Result<usize> {
        let key = NodePath::parse(path)?.to_string();

        let mut registry = self.registry.lock();
        registry.direct.remove(&key);
        registry.bubble.remove(&key);

        let before = registry.subscriptions.len();
        registry.subscriptions.retain(|_, s| s.path != key);
        let removed = before - registry.subscriptions.len();

        debug!(path = %key, removed, "cleared subscriptions");
        Ok(removed)
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.lock().subscriptions.len()
    }

    /// Number of listeners on `bus` at exactly `path`.
    pub fn listener_count(&self, path: &str, bus: Bus) -> usize {
        let Ok(path) = NodePath::parse(path) else {
            return 0;
        };
        self.registry
            .lock()
            .bus(bus)
            .get(&path.to_string())
            .map_or(0, Vec::len)
    }

    fn is_live(&self, id: SubscriptionId) -> bool {
        self.registry.lock().subscriptions.contains_key(&id)
    }

    // --- Emission ---

    /// Emit `event` at `path` and bubble it to every ancestor.
    ///
    /// The source object is looked up through `lookup`, except for a
    /// `delete` event with exactly two extras, which are taken as the
    /// deleted object's `(type, obj)`. Only a string `type` names a type;
    /// `null` or any other JSON value leaves the source untyped, while `obj`
    /// is passed through unchanged. Emitting at a path with no node is
    /// allowed; the source is then empty.
    pub fn emit(
        &self,
        path: &str,
        event: impl Into<Event>,
        extra: Vec<Value>,
        lookup: &dyn SourceLookup,
    ) -> Result<()> {
        let path = NodePath::parse(path)?;
        let event = event.into();

        let state = if event.name == DELETE_EVENT && extra.len() == 2 {
            ObjectState::new(extra[0].as_str().map(str::to_string), extra[1].clone())
        } else {
            match lookup.lookup(&path) {
                Ok(state) => state,
                Err(e) if e.is_not_found() => ObjectState::default(),
                Err(e) => return Err(e),
            }
        };

        self.emit_with_source(&path, event, state, extra)
    }

    /// Emit with an explicitly supplied source object.
    pub fn emit_with_source(
        &self,
        path: &NodePath,
        event: Event,
        state: ObjectState,
        extra: Vec<Value>,
    ) -> Result<()> {
        let origin = path.to_string();
        let notification = Notification {
            path: origin.clone(),
            event: event.name,
            source: EventSource {
                path: origin.clone(),
                triggered: event.triggered,
                obj: state.obj,
                type_name: state.type_name,
            },
            extra,
        };

        self.dispatch(Bus::Direct, &origin, &notification)?;
        for ancestor in path.ancestors() {
            self.dispatch(Bus::Bubble, &ancestor.to_string(), &notification)?;
        }
        Ok(())
    }

    /// Invoke the listeners on one bus at one path, in registration order.
    fn dispatch(&self, bus: Bus, path: &str, notification: &Notification) -> Result<()> {
        let listeners: Vec<Arc<Listener>> = self
            .registry
            .lock()
            .bus(bus)
            .get(path)
            .cloned()
            .unwrap_or_default();

        if listeners.is_empty() {
            return Ok(());
        }
        trace!(?bus, path, event = %notification.event, count = listeners.len(), "dispatch");

        let mut outcome = Ok(());
        let mut disconnected = Vec::new();
        for listener in listeners {
            // Skip listeners removed by an earlier listener in this dispatch.
            if !self.is_live(listener.id) || !listener.accepts(notification) {
                continue;
            }
            match &listener.sink {
                Sink::Callback(callback) => {
                    if let Err(e) = callback(notification) {
                        outcome = Err(e);
                        break;
                    }
                }
                Sink::Channel(sender) => {
                    if sender.send(notification.clone()).is_err() {
                        disconnected.push(listener.id);
                    }
                }
            }
        }

        for id in disconnected {
            trace!(%id, "channel receiver gone");
            self.unsubscribe(id);
        }
        outcome
    }
}

impl Default for Bubbler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use serde_json::json;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(
        log: &Log,
        tag: &'static str,
    ) -> impl Fn(&Notification) -> Result<()> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |n| {
            log.lock().push(format!("{}:{}@{}", tag, n.event, n.path));
            Ok(())
        }
    }

    /// Every path holds a "user" object.
    struct Users;

    impl SourceLookup for Users {
        fn lookup(&self, _path: &NodePath) -> Result<ObjectState> {
            Ok(ObjectState::new(Some("user".into()), json!({"type": "user"})))
        }
    }

    struct Missing;

    impl SourceLookup for Missing {
        fn lookup(&self, path: &NodePath) -> Result<ObjectState> {
            Err(StoreError::NotFound(path.to_string()))
        }
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let bubbler = Bubbler::new();
        let id = bubbler
            .subscribe("/a", SubscribeOptions::default(), |_| Ok(()))
            .unwrap();
        assert_eq!(bubbler.subscription_count(), 1);
        assert_eq!(bubbler.listener_count("/a", Bus::Direct), 1);
        assert_eq!(bubbler.listener_count("/a", Bus::Bubble), 1);

        assert!(bubbler.unsubscribe(id));
        assert_eq!(bubbler.subscription_count(), 0);
        assert_eq!(bubbler.listener_count("/a", Bus::Direct), 0);
        assert_eq!(bubbler.listener_count("/a", Bus::Bubble), 0);
        assert!(!bubbler.unsubscribe(id));
    }

    #[test]
    fn test_direct_only_skips_bubble_bus() {
        let bubbler = Bubbler::new();
        bubbler
            .subscribe("/a", SubscribeOptions::direct(), |_| Ok(()))
            .unwrap();
        assert_eq!(bubbler.listener_count("/a", Bus::Direct), 1);
        assert_eq!(bubbler.listener_count("/a", Bus::Bubble), 0);
    }

    #[test]
    fn test_bubbles_through_every_ancestor() {
        let bubbler = Bubbler::new();
        let log: Log = Arc::default();
        for path in ["/", "/a", "/a/b", "/a/b/c"] {
            let log = Arc::clone(&log);
            bubbler
                .subscribe(path, SubscribeOptions::default(), move |n| {
                    log.lock().push(format!("{} <- {}", path, n.path));
                    Ok(())
                })
                .unwrap();
        }

        bubbler.emit("/a/b/c", "changed", vec![], &Users).unwrap();
        assert_eq!(
            *log.lock(),
            vec![
                "/a/b/c <- /a/b/c",
                "/a/b <- /a/b/c",
                "/a <- /a/b/c",
                "/ <- /a/b/c",
            ]
        );
    }

    #[test]
    fn test_root_emit_dispatches_once() {
        let bubbler = Bubbler::new();
        let log: Log = Arc::default();
        bubbler
            .subscribe("/", SubscribeOptions::default(), recorder(&log, "root"))
            .unwrap();

        bubbler.emit("/", "changed", vec![], &Users).unwrap();
        assert_eq!(*log.lock(), vec!["root:changed@/"]);
    }

    #[test]
    fn test_non_bubbling_ignores_descendants() {
        let bubbler = Bubbler::new();
        let log: Log = Arc::default();
        bubbler
            .subscribe("/a", SubscribeOptions::direct(), recorder(&log, "a"))
            .unwrap();

        bubbler.emit("/a/b", "changed", vec![], &Users).unwrap();
        assert!(log.lock().is_empty());

        bubbler.emit("/a", "changed", vec![], &Users).unwrap();
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_missing_path_still_bubbles() {
        let bubbler = Bubbler::new();
        let seen: Arc<Mutex<Vec<Notification>>> = Arc::default();
        let sink = Arc::clone(&seen);
        bubbler
            .subscribe("/", SubscribeOptions::default(), move |n| {
                sink.lock().push(n.clone());
                Ok(())
            })
            .unwrap();

        bubbler.emit("/nowhere/deep", "ping", vec![], &Missing).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].source.obj, Value::Null);
        assert_eq!(seen[0].source.type_name, None);
    }

    #[test]
    fn test_lookup_errors_other_than_not_found_propagate() {
        struct Broken;
        impl SourceLookup for Broken {
            fn lookup(&self, _path: &NodePath) -> Result<ObjectState> {
                Err(StoreError::Serialization("boom".into()))
            }
        }

        let bubbler = Bubbler::new();
        let result = bubbler.emit("/a", "ping", vec![], &Broken);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_delete_with_two_extras_uses_them_as_source() {
        let bubbler = Bubbler::new();
        let seen: Arc<Mutex<Vec<Notification>>> = Arc::default();
        let sink = Arc::clone(&seen);
        bubbler
            .subscribe("/a", SubscribeOptions::default(), move |n| {
                sink.lock().push(n.clone());
                Ok(())
            })
            .unwrap();

        bubbler
            .emit(
                "/a/b",
                "delete",
                vec![json!("group"), json!({"name": "admins"})],
                &Users,
            )
            .unwrap();
        bubbler
            .emit("/a/b", "delete", vec![json!("group")], &Users)
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen[0].type_name(), Some("group"));
        assert_eq!(seen[0].source.obj, json!({"name": "admins"}));
        assert_eq!(seen[1].type_name(), Some("user"));
    }

    #[test]
    fn test_type_filter() {
        let bubbler = Bubbler::new();
        let log: Log = Arc::default();
        bubbler
            .subscribe(
                "/",
                SubscribeOptions::default().with_filter(Filter::types(["group"])),
                recorder(&log, "groups"),
            )
            .unwrap();
        bubbler
            .subscribe(
                "/",
                SubscribeOptions::default().with_filter(Filter::types(["user"])),
                recorder(&log, "users"),
            )
            .unwrap();

        bubbler.emit("/a", "changed", vec![], &Users).unwrap();
        assert_eq!(*log.lock(), vec!["users:changed@/a"]);
    }

    #[test]
    fn test_untriggered_only_listener() {
        let bubbler = Bubbler::new();
        let log: Log = Arc::default();
        let options = SubscribeOptions {
            triggered: false,
            ..Default::default()
        };
        bubbler
            .subscribe("/a", options, recorder(&log, "quiet"))
            .unwrap();
        bubbler
            .subscribe("/a", SubscribeOptions::default(), recorder(&log, "all"))
            .unwrap();

        bubbler
            .emit("/a", Event::triggered("sync"), vec![], &Users)
            .unwrap();
        bubbler.emit("/a", "sync", vec![], &Users).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["all:sync@/a", "quiet:sync@/a", "all:sync@/a"]
        );
    }

    #[test]
    fn test_clear_subscriptions_is_exact() {
        let bubbler = Bubbler::new();
        for path in ["/", "/a", "/a", "/a/b"] {
            bubbler
                .subscribe(path, SubscribeOptions::default(), |_| Ok(()))
                .unwrap();
        }

        assert_eq!(bubbler.clear_subscriptions("/a/").unwrap(), 2);
        assert_eq!(bubbler.subscription_count(), 2);
        assert_eq!(bubbler.listener_count("/a", Bus::Direct), 0);
        assert_eq!(bubbler.listener_count("/a", Bus::Bubble), 0);
        assert_eq!(bubbler.listener_count("/", Bus::Direct), 1);
        assert_eq!(bubbler.listener_count("/a/b", Bus::Bubble), 1);
    }

    #[test]
    fn test_listener_error_aborts_dispatch() {
        let bubbler = Bubbler::new();
        let log: Log = Arc::default();
        bubbler
            .subscribe("/a", SubscribeOptions::default(), |_| {
                Err(StoreError::Listener("rejected".into()))
            })
            .unwrap();
        bubbler
            .subscribe("/a", SubscribeOptions::default(), recorder(&log, "later"))
            .unwrap();
        bubbler
            .subscribe("/", SubscribeOptions::default(), recorder(&log, "root"))
            .unwrap();

        let result = bubbler.emit("/a", "changed", vec![], &Users);
        assert!(matches!(result, Err(StoreError::Listener(_))));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_unsubscribe_during_dispatch() {
        let bubbler = Arc::new(Bubbler::new());
        let log: Log = Arc::default();
        let victim: Arc<Mutex<Option<SubscriptionId>>> = Arc::default();

        let weak = Arc::downgrade(&bubbler);
        let target = Arc::clone(&victim);
        bubbler
            .subscribe("/a", SubscribeOptions::default(), move |_| {
                if let (Some(bubbler), Some(id)) = (weak.upgrade(), *target.lock()) {
                    bubbler.unsubscribe(id);
                }
                Ok(())
            })
            .unwrap();
        let id = bubbler
            .subscribe("/a", SubscribeOptions::default(), recorder(&log, "victim"))
            .unwrap();
        *victim.lock() = Some(id);

        bubbler.emit("/a", "changed", vec![], &Detached).unwrap();
        assert!(log.lock().is_empty());
        assert_eq!(bubbler.subscription_count(), 1);
    }

    #[test]
    fn test_same_callback_on_two_paths() {
        let bubbler = Bubbler::new();
        let log: Log = Arc::default();
        let callback: Callback = Arc::new(recorder(&log, "shared"));

        let a = bubbler
            .subscribe_callback("/a", SubscribeOptions::direct(), Arc::clone(&callback))
            .unwrap();
        bubbler
            .subscribe_callback("/b", SubscribeOptions::direct(), callback)
            .unwrap();

        bubbler.unsubscribe(a);
        bubbler.emit("/a", "x", vec![], &Detached).unwrap();
        bubbler.emit("/b", "x", vec![], &Detached).unwrap();
        assert_eq!(*log.lock(), vec!["shared:x@/b"]);
    }

    #[test]
    fn test_channel_subscription() {
        let bubbler = Bubbler::new();
        let sub = bubbler
            .subscribe_channel("/a", SubscribeOptions::default())
            .unwrap();

        bubbler.emit("/a/b", "changed", vec![json!(1)], &Users).unwrap();

        let notification = sub.try_recv().unwrap();
        assert_eq!(notification.path, "/a/b");
        assert_eq!(notification.extra, vec![json!(1)]);
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn test_dropped_channel_is_pruned() {
        let bubbler = Bubbler::new();
        let kept = bubbler
            .subscribe_channel("/a", SubscribeOptions::default())
            .unwrap();
        for _ in 0..100 {
            let dropped = bubbler
                .subscribe_channel("/a", SubscribeOptions::default())
                .unwrap();
            drop(dropped);
        }
        assert_eq!(bubbler.subscription_count(), 101);

        bubbler.emit("/a", "changed", vec![], &Users).unwrap();

        assert_eq!(bubbler.subscription_count(), 1);
        assert_eq!(bubbler.listener_count("/a", Bus::Direct), 1);
        assert_eq!(bubbler.listener_count("/a", Bus::Bubble), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn test_delete_with_untyped_extra() {
        let bubbler = Bubbler::new();
        let seen: Arc<Mutex<Vec<Notification>>> = Arc::default();
        let sink = Arc::clone(&seen);
        bubbler
            .subscribe("/a", SubscribeOptions::default(), move |n| {
                sink.lock().push(n.clone());
                Ok(())
            })
            .unwrap();

        bubbler
            .emit("/a", "delete", vec![json!(7), json!({"n": 1})], &Users)
            .unwrap();
        bubbler
            .emit("/a", "delete", vec![Value::Null, json!([1, 2])], &Users)
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen[0].type_name(), None);
        assert_eq!(seen[0].source.obj, json!({"n": 1}));
        assert_eq!(seen[1].type_name(), None);
        assert_eq!(seen[1].source.obj, json!([1, 2]));
    }
}
