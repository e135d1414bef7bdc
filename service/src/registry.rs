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

//! Connection registry
//!
//! Tracks every live server connection by [`ConnectionId`]. Iteration only
//! ever happens over a snapshot, so a broadcast never holds a shard lock
//! while it talks to workers.

use crate::types::{ConnectionId, ConnectionInfo};
use crate::worker::ControlMessage;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The server's handle to one connection worker
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer_addr: SocketAddr,
    connected_at: Instant,
    control_tx: mpsc::UnboundedSender<ControlMessage>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle for a freshly accepted connection
    pub fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        control_tx: mpsc::UnboundedSender<ControlMessage>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
            control_tx,
            cancel,
        }
    }

    /// Connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Queue text for the worker. Returns false if the worker is gone.
    pub fn send(&self, text: String) -> bool {
        self.control_tx.send(ControlMessage::Send(text)).is_ok()
    }

    /// Close after the writes already queued have been performed
    pub fn request_close(&self) {
        if self.control_tx.send(ControlMessage::Close).is_err() {
            self.cancel.cancel();
        }
    }

    /// Shut the socket down immediately, dropping queued writes
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Snapshot of this connection
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            peer_addr: self.peer_addr,
            connected_at: self.connected_at,
        }
    }
}

/// Concurrent map of live connections
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
    /// Never reset, so ids are not reused across restarts
    next_id: AtomicU64,
    live: AtomicUsize,
    accepted: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Create an empty registry; the first id handed out is 1
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            live: AtomicUsize::new(0),
            accepted: AtomicU64::new(0),
        }
    }

    /// Allocate the next connection ID
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a connection. Returns false if the id was already present.
    pub fn insert(&self, handle: ConnectionHandle) -> bool {
        let id = handle.id();
        match self.connections.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle);
                self.live.fetch_add(1, Ordering::SeqCst);
                self.accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
        }
    }

    /// Remove a connection, returning its handle if it was registered
    pub fn remove(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        let (_, handle) = self.connections.remove(&id)?;
        self.live.fetch_sub(1, Ordering::SeqCst);
        Some(handle)
    }

    /// Clone of the handle for `id`
    pub fn get(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.connections.get(&id).map(|entry| entry.value().clone())
    }

    /// Check whether `id` is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Point-in-time copy of every handle, ordered by id
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        let mut handles: Vec<_> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        handles.sort_by_key(ConnectionHandle::id);
        handles
    }

    /// Registered ids, ascending
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.connections.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Check if no connection is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return every handle
    pub fn drain(&self) -> Vec<ConnectionHandle> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.remove(id))
            .collect()
    }

    /// Connections ever registered
    pub fn total_accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}
