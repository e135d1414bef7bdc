//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Notification bus
//!
//! Both engines report everything that happens through a [`NotificationBus`]:
//! status transitions, received lines, connects and disconnects, write
//! results and errors. Observers are called synchronously on the task that
//! raised the notification, in the order they were subscribed. Observers
//! that need to do real work should hand the notification off, for example
//! through a [`ChannelObserver`].

use crate::reply::Reply;
use crate::status::ServiceStatus;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// The engine is about to start
    Initialized,
    /// The engine status changed
    StatusChange,
    /// A command line arrived
    ReceivedLine,
    /// A peer connected
    ClientConnected,
    /// A peer disconnected
    ClientDisconnected,
    /// Text was written to a peer
    Write,
    /// Text could not be written to a peer
    WriteFailed,
    /// A transport or configuration failure
    Error,
    /// Outcome of a one-shot wake command
    Wakeup,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single event raised by an engine
#[derive(Debug, Clone)]
pub struct Notification {
    /// What happened
    pub kind: NotificationKind,
    /// Engine status at the time it was raised
    pub status: ServiceStatus,
    /// Handle to answer the peer, when there is one
    pub reply: Option<Reply>,
    /// Human readable detail, or the received line for `ReceivedLine`
    pub message: String,
}

impl Notification {
    /// Create a notification without a reply handle
    pub fn new(kind: NotificationKind, status: ServiceStatus, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            reply: None,
            message: message.into(),
        }
    }

    /// Attach a reply handle
    pub fn with_reply(mut self, reply: Reply) -> Self {
        self.reply = Some(reply);
        self
    }
}

/// Receiver of notifications.
///
/// Implementations must not block; they run inline on engine tasks.
pub trait NotificationObserver: Send + Sync {
    /// Called once per published notification
    fn on_notification(&self, notification: &Notification);
}

impl<F> NotificationObserver for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn on_notification(&self, notification: &Notification) {
        self(notification)
    }
}

/// Forwards notifications into an unbounded Tokio channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationObserver for ChannelObserver {
    fn on_notification(&self, notification: &Notification) {
        // Receiver gone means nobody is listening anymore
        let _ = self.tx.send(notification.clone());
    }
}

/// Logs every notification through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl NotificationObserver for LogObserver {
    fn on_notification(&self, n: &Notification) {
        match n.kind {
            NotificationKind::Error => {
                error!(kind = %n.kind, status = %n.status, "{}", n.message)
            }
            NotificationKind::WriteFailed | NotificationKind::Wakeup => {
                warn!(kind = %n.kind, status = %n.status, "{}", n.message)
            }
            NotificationKind::ReceivedLine | NotificationKind::Write => {
                debug!(kind = %n.kind, status = %n.status, "{}", n.message)
            }
            _ => info!(kind = %n.kind, status = %n.status, "{}", n.message),
        }
    }
}

/// Token returned by [`NotificationBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverList = Vec<(ObserverId, Arc<dyn NotificationObserver>)>;

/// Synchronous multicast of [`Notification`]s.
///
/// Cloning the bus yields another handle to the same observer list.
#[derive(Clone, Default)]
pub struct NotificationBus {
    observers: Arc<RwLock<ObserverList>>,
    next_id: Arc<AtomicU64>,
}

impl NotificationBus {
    /// Create a bus with no observers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; it sees every notification published afterwards
    pub fn subscribe(&self, observer: impl NotificationObserver + 'static) -> ObserverId {
        self.subscribe_arc(Arc::new(observer))
    }

    /// Add a shared observer
    pub fn subscribe_arc(&self, observer: Arc<dyn NotificationObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, observer));
        id
    }

    /// Remove an observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    /// Number of subscribed observers
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Deliver `notification` to every observer in subscription order
    pub fn publish(&self, notification: Notification) {
        // Snapshot so observers may subscribe or unsubscribe from the callback
        let observers: Vec<Arc<dyn NotificationObserver>> = self
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.on_notification(&notification);
        }
    }

    /// Build and publish a notification
    pub fn raise(
        &self,
        kind: NotificationKind,
        status: ServiceStatus,
        reply: Option<Reply>,
        message: impl Into<String>,
    ) {
        let mut notification = Notification::new(kind, status, message);
        notification.reply = reply;
        self.publish(notification);
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("observers", &self.observer_count())
            .finish()
    }
}
