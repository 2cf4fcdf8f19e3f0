//! Device notifications.
//!
//! A subscription asks the device to push a memory region whenever it
//! changes (or every cycle). The device answers with a handle; incoming
//! samples carry that handle and are routed through the [`SubscriptionTable`]
//! to the subscriber's callback, each on its own task.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use adsprims_frame::request::{delete_notification_request, AddNotificationRequest};
use adsprims_frame::response::{parse_add_notification_response, parse_write_response};
use adsprims_frame::{
    parse_notification, NotificationSample, TransmissionMode, ADS_ADD_NOTIFICATION,
    ADS_DELETE_NOTIFICATION,
};
use adsprims_types::{decode, TypeNode, Value};
use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::config::SubscriptionSettings;
use crate::connection::{lock, Connection};
use crate::error::Result;

/// One delivered sample.
#[derive(Debug, Clone)]
pub struct Notification {
    pub handle: u32,
    /// Device timestamp of the sample.
    pub timestamp: SystemTime,
    /// Decoded value; `None` for raw subscriptions.
    pub value: Option<Value>,
    pub raw: Bytes,
}

pub type NotificationCallback = Arc<dyn Fn(Notification) + Send + Sync>;

/// A live device notification.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub handle: u32,
    pub port: u16,
    pub index_group: u32,
    pub index_offset: u32,
    pub size: u32,
    pub settings: SubscriptionSettings,
    /// Layout used to decode samples; `None` delivers raw bytes only.
    pub type_node: Option<Arc<TypeNode>>,
}

struct Entry {
    subscription: Subscription,
    callback: NotificationCallback,
}

/// Active subscriptions keyed by notification handle.
#[derive(Default)]
pub struct SubscriptionTable {
    entries: Mutex<HashMap<u32, Entry>>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, handle: u32) -> bool {
        lock(&self.entries).contains_key(&handle)
    }

    /// Copy of every registered subscription.
    pub fn snapshot(&self) -> Vec<Subscription> {
        lock(&self.entries)
            .values()
            .map(|entry| entry.subscription.clone())
            .collect()
    }

    pub(crate) fn insert(&self, subscription: Subscription, callback: NotificationCallback) {
        let handle = subscription.handle;
        let previous = lock(&self.entries).insert(
            handle,
            Entry {
                subscription,
                callback,
            },
        );
        if previous.is_some() {
            warn!(handle, "notification handle reused; previous subscription replaced");
        }
    }

    pub(crate) fn remove(&self, handle: u32) -> Option<Subscription> {
        lock(&self.entries)
            .remove(&handle)
            .map(|entry| entry.subscription)
    }

    /// Route a Notification command payload to the subscribers.
    ///
    /// Each sample for a known handle is delivered on its own task. Samples
    /// for unknown handles are logged and skipped. Must be called from
    /// within a tokio runtime.
    pub fn dispatch(&self, payload: &Bytes) {
        let stamps = match parse_notification(payload) {
            Ok(stamps) => stamps,
            Err(err) => {
                warn!(%err, "malformed notification payload");
                return;
            }
        };

        for stamp in stamps {
            for sample in stamp.samples {
                let target = lock(&self.entries)
                    .get(&sample.handle)
                    .map(|entry| (entry.callback.clone(), entry.subscription.type_node.clone()));
                let Some((callback, type_node)) = target else {
                    warn!(handle = sample.handle, "notification for unknown handle");
                    continue;
                };
                let timestamp = stamp.timestamp;
                tokio::spawn(async move {
                    deliver(callback, type_node, sample, timestamp);
                });
            }
        }
    }
}

fn deliver(
    callback: NotificationCallback,
    type_node: Option<Arc<TypeNode>>,
    sample: NotificationSample,
    timestamp: SystemTime,
) {
    let handle = sample.handle;
    let value = match type_node.as_deref() {
        Some(node) => match decode(&sample.payload, node) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(handle, %err, "dropping undecodable notification sample");
                return;
            }
        },
        None => None,
    };

    let notification = Notification {
        handle,
        timestamp,
        value,
        raw: sample.payload,
    };
    if catch_unwind(AssertUnwindSafe(|| callback(notification))).is_err() {
        error!(handle, "notification callback panicked");
    }
}

/// Register a device notification and route its samples to `callback`.
#[allow(clippy::too_many_arguments)]
pub async fn add_notification(
    conn: &Connection,
    port: u16,
    index_group: u32,
    index_offset: u32,
    size: u32,
    settings: SubscriptionSettings,
    type_node: Option<Arc<TypeNode>>,
    callback: NotificationCallback,
) -> Result<Subscription> {
    let request = AddNotificationRequest {
        index_group,
        index_offset,
        length: size,
        mode: if settings.send_on_change {
            TransmissionMode::OnChange
        } else {
            TransmissionMode::Cyclic
        },
        max_delay: settings.max_delay,
        cycle_time: settings.cycle_time,
    };
    let reply = conn
        .send(ADS_ADD_NOTIFICATION, port, &request.encode())
        .await?;
    let handle = parse_add_notification_response(&reply)?;

    let subscription = Subscription {
        handle,
        port,
        index_group,
        index_offset,
        size,
        settings,
        type_node,
    };
    conn.subscriptions().insert(subscription.clone(), callback);
    debug!(handle, port, index_group, index_offset, size, "subscription created");
    Ok(subscription)
}

/// Delete a device notification. The table entry is removed only once the
/// device confirmed the delete.
pub async fn delete_notification(conn: &Connection, subscription: &Subscription) -> Result<()> {
    let reply = conn
        .send(
            ADS_DELETE_NOTIFICATION,
            subscription.port,
            &delete_notification_request(subscription.handle),
        )
        .await?;
    parse_write_response(&reply)?;
    conn.subscriptions().remove(subscription.handle);
    debug!(handle = subscription.handle, "subscription removed");
    Ok(())
}

/// Delete every registered notification, continuing past failures.
///
/// Returns the first error encountered, if any.
pub async fn delete_all_notifications(conn: &Connection) -> Result<()> {
    let mut first_error = None;
    for subscription in conn.subscriptions().snapshot() {
        if let Err(err) = delete_notification(conn, &subscription).await {
            warn!(handle = subscription.handle, %err, "unsubscribe failed");
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
