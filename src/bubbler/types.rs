//! Subscription types.

use super::filter::Filter;
use crate::error::{Result, StoreError};
use crate::types::Notification;
use serde_json::Value;
use std::fmt;

/// Options for a subscription.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscribeOptions {
    /// Also receive events bubbling up from descendants.
    /// Default: true
    pub bubble: bool,

    /// Every filter must match for the listener to fire.
    pub filters: Vec<Filter>,

    /// Receive triggered events. When false, only untriggered events fire.
    /// Default: true
    pub triggered: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            bubble: true,
            filters: Vec::new(),
            triggered: true,
        }
    }
}

impl SubscribeOptions {
    /// Listen only to events emitted exactly at the path.
    pub fn direct() -> Self {
        Self {
            bubble: false,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Parse options from JSON: `{"bubble", "filters", "triggered"}`.
    ///
    /// Malformed filters fail with `InvalidFilter`, anything else that is
    /// malformed fails with `InvalidConfiguration`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(StoreError::InvalidConfiguration(format!(
                    "subscription options must be an object, got {}",
                    other
                )))
            }
        };

        let mut options = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "bubble" => options.bubble = expect_bool(key, value)?,
                "triggered" => options.triggered = expect_bool(key, value)?,
                "filters" => options.filters = Filter::parse_many(value)?,
                other => {
                    return Err(StoreError::InvalidConfiguration(format!(
                        "unknown subscription option {:?}",
                        other
                    )))
                }
            }
        }
        Ok(options)
    }
}

fn expect_bool(key: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        StoreError::InvalidConfiguration(format!("option {:?} must be a boolean", key))
    })
}

/// Opaque token identifying one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// The two listener registries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bus {
    /// Events emitted exactly at a path.
    Direct,
    /// Events bubbling up from descendants of a path.
    Bubble,
}

/// A subscription that delivers notifications over a channel.
pub struct ChannelSubscription {
    pub id: SubscriptionId,
    pub receiver: crossbeam_channel::Receiver<Notification>,
}

impl ChannelSubscription {
    /// Receive the next notification (blocking).
    pub fn recv(&self) -> std::result::Result<Notification, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<Notification, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> std::result::Result<Notification, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<Notification> {
        self.receiver.try_iter().collect()
    }
}
