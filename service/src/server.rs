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

//! Command server implementation
//!
//! The CommandServer owns the TCP listener, accepts connections, hands each
//! one to a [`ConnectionWorker`](crate::worker::ConnectionWorker) and keeps the
//! [`ConnectionRegistry`] up to date. Everything observable is reported on the
//! server's [`NotificationBus`].

use crate::config::ServerConfig;
use crate::error::{Result, ServiceError};
use crate::notification::{NotificationBus, NotificationKind};
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::reply::{Reply, ReplySink, ReplyTarget};
use crate::status::{ServiceStatus, StatusCell};
use crate::types::{ConnectionId, ConnectionInfo};
use crate::wakeup::send_wake_command;
use crate::worker::{CloseReason, ConnectionWorker, WorkerEvents};
use metrics::{counter, gauge};
use std::io;
use std::mem;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Multi-client line command server
///
/// # Example
///
/// ```no_run
/// use cmdwire_service::{CommandServer, Notification, NotificationKind, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = CommandServer::new(ServerConfig::default())?;
///
///     server.bus().subscribe(|n: &Notification| {
///         if n.kind == NotificationKind::ReceivedLine {
///             if let Some(reply) = &n.reply {
///                 reply.write_line(&format!("ack {}", n.message));
///             }
///         }
///     });
///
///     server.start(9000).await?;
///     tokio::signal::ctrl_c().await?;
///     server.stop();
///     Ok(())
/// }
/// ```
pub struct CommandServer {
    inner: Arc<ServerInner>,
}

impl CommandServer {
    /// Create a stopped server with its own notification bus
    pub fn new(config: ServerConfig) -> Result<Self> {
        Self::with_bus(config, NotificationBus::new())
    }

    /// Create a stopped server publishing on `bus`
    pub fn with_bus(config: ServerConfig, bus: NotificationBus) -> Result<Self> {
        config.validate()?;
        let inner = Arc::new_cyclic(|this| ServerInner {
            config,
            bus,
            status: StatusCell::default(),
            registry: ConnectionRegistry::new(),
            listener: Mutex::new(ListenerState::default()),
            this: this.clone(),
        });
        Ok(Self { inner })
    }

    /// Bind the listener on `port` and begin accepting connections.
    ///
    /// A bind failure is reported as an `Error` notification and leaves the
    /// server `Stopped`; it is not returned. Returns
    /// [`ServiceError::AlreadyRunning`] if the server is already started.
    #[instrument(skip(self))]
    pub async fn start(&self, port: u16) -> Result<()> {
        let inner = &self.inner;

        let retired = {
            let mut state = inner.lock_listener();
            if !matches!(state.phase, ListenerPhase::Idle) {
                return Err(ServiceError::AlreadyRunning);
            }
            state.phase = ListenerPhase::Starting;
            state.retired.take()
        };
        // Wait for the previous accept loop to release its socket
        if let Some(handle) = retired {
            if let Err(e) = handle.await {
                debug!(error = %e, "Previous accept loop ended abnormally");
            }
        }

        inner.raise(
            NotificationKind::Initialized,
            None,
            format!("Starting command server on port {}", port),
        );

        let address = SocketAddr::new(inner.config.bind_address, port);
        let (listener, local_addr) = match bind_listener(address, inner.config.backlog) {
            Ok(bound) => bound,
            Err(e) => {
                {
                    let mut state = inner.lock_listener();
                    if matches!(state.phase, ListenerPhase::Starting) {
                        state.phase = ListenerPhase::Idle;
                    }
                }
                warn!(%address, error = %e, "Unable to listen");
                inner.raise(
                    NotificationKind::Error,
                    None,
                    format!("Unable to listen on {}: {}", address, e),
                );
                inner.set_status(ServiceStatus::Stopped, "Command server stopped");
                return Ok(());
            }
        };

        info!(%local_addr, "Command server listening");
        inner.set_status(ServiceStatus::Started, format!("Listening on {}", local_addr));
        inner.set_status(ServiceStatus::Waiting, "Waiting for connections");

        let mut state = inner.lock_listener();
        if !matches!(state.phase, ListenerPhase::Starting) {
            // stop() ran while we were binding
            drop(state);
            drop(listener);
            inner.set_status(ServiceStatus::Stopped, "Command server stopped");
            return Ok(());
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(accept_loop(Arc::clone(inner), listener, cancel.clone()));
        state.phase = ListenerPhase::Listening(ListenerTask {
            local_addr,
            cancel,
            handle,
        });
        Ok(())
    }

    /// Stop listening and close every connection. Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Send `text` to the destination of `reply`, or to every connection
    /// when `reply` is `None`.
    ///
    /// Never blocks. Delivery outcomes arrive as `Write`, `WriteFailed` or
    /// `Error` notifications.
    pub fn send(&self, text: &str, reply: Option<&Reply>) {
        let target = reply.map_or(ReplyTarget::Broadcast, Reply::target);
        self.inner.deliver(target, text);
    }

    /// Close one connection after its queued writes
    pub fn disconnect(&self, id: ConnectionId) -> Result<()> {
        if !self.inner.status.get().is_running() {
            return Err(ServiceError::NotRunning);
        }
        let handle = self
            .inner
            .registry
            .get(id)
            .ok_or(ServiceError::ConnectionNotFound(id))?;
        handle.request_close();
        Ok(())
    }

    /// Connect to `host:port`, write `command` and disconnect.
    ///
    /// The outcome is reported as a `Wakeup` notification; server state is
    /// not affected.
    pub async fn send_awake_command(&self, command: &str, host: &str, port: u16) {
        let message =
            match send_wake_command(command, host, port, self.inner.config.wake_timeout).await {
                Ok(address) => format!("Wake command sent to {}", address),
                Err(e) => e.to_string(),
            };
        self.inner.raise(NotificationKind::Wakeup, None, message);
    }

    /// A reply handle addressed to `target` on this server
    pub fn reply(&self, target: ReplyTarget) -> Reply {
        self.inner.reply_to(target)
    }

    /// Current status
    pub fn status(&self) -> ServiceStatus {
        self.inner.status.get()
    }

    /// Address the listener is bound to, while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.inner.lock_listener().phase {
            ListenerPhase::Listening(task) => Some(task.local_addr),
            _ => None,
        }
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// IDs of live connections, ascending
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.inner.registry.ids()
    }

    /// Snapshot of one connection
    pub fn connection_info(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.inner.registry.get(id).map(|handle| handle.info())
    }

    /// Total connections accepted since creation
    pub fn total_connections(&self) -> u64 {
        self.inner.registry.total_accepted()
    }

    /// The bus this server publishes on
    pub fn bus(&self) -> &NotificationBus {
        &self.inner.bus
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        if self.inner.status.get().is_running() {
            warn!("CommandServer dropped while still running");
            self.inner.stop();
        }
    }
}

impl std::fmt::Debug for CommandServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandServer")
            .field("status", &self.status())
            .field("local_addr", &self.local_addr())
            .field("connections", &self.connection_count())
            .finish()
    }
}

struct ListenerTask {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
enum ListenerPhase {
    #[default]
    Idle,
    Starting,
    Listening(ListenerTask),
}

#[derive(Default)]
struct ListenerState {
    phase: ListenerPhase,
    /// Accept loop of the previous run, still releasing its socket
    retired: Option<JoinHandle<()>>,
}

/// State shared between the server handle, its accept loop and its workers
struct ServerInner {
    config: ServerConfig,
    bus: NotificationBus,
    status: StatusCell,
    registry: ConnectionRegistry,
    listener: Mutex<ListenerState>,
    this: Weak<ServerInner>,
}

impl ServerInner {
    fn lock_listener(&self) -> MutexGuard<'_, ListenerState> {
        self.listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn raise(&self, kind: NotificationKind, reply: Option<Reply>, message: impl Into<String>) {
        self.bus.raise(kind, self.status.get(), reply, message);
    }

    /// Store `status`; publishes `StatusChange` only when it differs
    fn set_status(&self, status: ServiceStatus, message: impl Into<String>) {
        if self.status.swap(status) != status {
            self.raise(NotificationKind::StatusChange, None, message);
        }
    }

    fn reply_to(&self, target: ReplyTarget) -> Reply {
        let sink: Weak<dyn ReplySink> = self.this.clone();
        Reply::new(target, sink)
    }

    fn stop(&self) {
        {
            let mut state = self.lock_listener();
            match mem::take(&mut state.phase) {
                ListenerPhase::Listening(task) => {
                    task.cancel.cancel();
                    state.retired = Some(task.handle);
                    debug!(local_addr = %task.local_addr, "Listener cancelled");
                }
                ListenerPhase::Starting | ListenerPhase::Idle => {}
            }
        }

        for handle in self.registry.drain() {
            handle.close();
        }
        gauge!("cmdwire.connections.active").set(0.0);

        if self.status.swap(ServiceStatus::Stopped) != ServiceStatus::Stopped {
            info!("Command server stopped");
            self.raise(NotificationKind::StatusChange, None, "Command server stopped");
        }
    }

    #[instrument(skip(self, stream, listener_cancel), fields(peer_addr = %peer_addr))]
    fn accept_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        peer_addr: SocketAddr,
        listener_cancel: &CancellationToken,
    ) {
        if let Some(max) = self.config.max_connections {
            if self.registry.len() >= max {
                warn!(max, "Connection limit reached, refusing client");
                self.raise(
                    NotificationKind::Error,
                    None,
                    format!("Connection from {} refused: limit of {} reached", peer_addr, max),
                );
                return;
            }
        }

        let id = self.registry.next_id();
        if let Err(e) = stream.set_nodelay(true) {
            debug!(connection_id = %id, error = %e, "Unable to set TCP_NODELAY");
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        self.registry.insert(ConnectionHandle::new(
            id,
            peer_addr,
            control_tx,
            cancel.clone(),
        ));
        if listener_cancel.is_cancelled() {
            self.abandon_connection(id);
            return;
        }

        counter!("cmdwire.connections.total").increment(1);
        gauge!("cmdwire.connections.active").set(self.registry.len() as f64);
        info!(connection_id = %id, "Client connected");

        self.set_status(
            ServiceStatus::Connected,
            format!("Connected to {}", peer_addr),
        );
        // stop() cancels the listener before it drains and stores Stopped, so a
        // cancel seen here may have been followed by our Connected
        if listener_cancel.is_cancelled() {
            self.abandon_connection(id);
            if self
                .status
                .transition(ServiceStatus::Connected, ServiceStatus::Stopped)
            {
                self.raise(NotificationKind::StatusChange, None, "Command server stopped");
            }
            return;
        }
        self.raise(
            NotificationKind::ClientConnected,
            Some(self.reply_to(ReplyTarget::Connection(id))),
            format!("{} connected from {}", id, peer_addr),
        );

        let worker = ConnectionWorker::new(
            id,
            stream,
            self.config.receive_buffer_size,
            control_rx,
            cancel,
            Arc::clone(self),
        );
        tokio::spawn(worker.run());
    }

    /// Drop a connection accepted while stop() was running
    fn abandon_connection(&self, id: ConnectionId) {
        debug!(connection_id = %id, "Listener stopped, dropping connection");
        if let Some(handle) = self.registry.remove(id) {
            handle.close();
        }
        gauge!("cmdwire.connections.active").set(self.registry.len() as f64);
    }

    fn deliver_to(&self, handle: &ConnectionHandle, text: &str) {
        if !handle.send(text.to_string()) {
            self.write_failed(
                handle.id(),
                format!("Unable to write to {}: connection is closing", handle.id()),
            );
        }
    }

    fn write_failed(&self, id: ConnectionId, message: String) {
        counter!("cmdwire.writes.failed").increment(1);
        self.raise(
            NotificationKind::WriteFailed,
            Some(self.reply_to(ReplyTarget::Connection(id))),
            message,
        );
    }
}

impl ReplySink for ServerInner {
    fn deliver(&self, target: ReplyTarget, text: &str) {
        if text.is_empty() {
            counter!("cmdwire.writes.failed").increment(1);
            self.raise(NotificationKind::WriteFailed, None, "Nothing to write");
            return;
        }

        match target {
            ReplyTarget::Connection(id) => match self.registry.get(id) {
                Some(handle) => self.deliver_to(&handle, text),
                None => self.write_failed(id, format!("Unable to write to {}: not connected", id)),
            },
            // A server has no single peer; treat it like a broadcast
            ReplyTarget::Broadcast | ReplyTarget::Peer => {
                let snapshot = self.registry.snapshot();
                debug!(connections = snapshot.len(), "Broadcasting");
                for handle in &snapshot {
                    self.deliver_to(handle, text);
                }
            }
        }
    }
}

impl WorkerEvents for ServerInner {
    fn line_received(&self, id: ConnectionId, line: String) {
        if !self.registry.contains(id) {
            return;
        }
        counter!("cmdwire.lines.received").increment(1);
        self.raise(
            NotificationKind::ReceivedLine,
            Some(self.reply_to(ReplyTarget::Connection(id))),
            line,
        );
    }

    fn write_completed(&self, id: ConnectionId, text: &str, result: io::Result<usize>) {
        match result {
            Ok(written) if written > 0 => {
                counter!("cmdwire.writes.total").increment(1);
                self.raise(
                    NotificationKind::Write,
                    Some(self.reply_to(ReplyTarget::Connection(id))),
                    text.trim(),
                );
            }
            Ok(_) => self.write_failed(id, format!("Unable to write to {}: 0 bytes written", id)),
            Err(e) if e.kind() == io::ErrorKind::WriteZero => {
                self.write_failed(id, format!("Unable to write to {}: {}", id, e))
            }
            Err(e) => {
                counter!("cmdwire.writes.failed").increment(1);
                self.raise(
                    NotificationKind::Error,
                    None,
                    format!("Write to {} failed: {}", id, e),
                );
            }
        }
    }

    fn connection_closed(&self, id: ConnectionId, reason: CloseReason) {
        let Some(handle) = self.registry.remove(id) else {
            return;
        };
        gauge!("cmdwire.connections.active").set(self.registry.len() as f64);
        info!(connection_id = %id, %reason, "Client disconnected");

        self.raise(
            NotificationKind::ClientDisconnected,
            None,
            format!("{} ({}) disconnected: {}", id, handle.peer_addr(), reason),
        );
        if self.registry.is_empty()
            && self
                .status
                .transition(ServiceStatus::Connected, ServiceStatus::Waiting)
        {
            self.raise(
                NotificationKind::StatusChange,
                None,
                "Waiting for connections",
            );
        }
    }
}

fn bind_listener(address: SocketAddr, backlog: u32) -> io::Result<(TcpListener, SocketAddr)> {
    let socket = if address.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    #[cfg(not(windows))]
    socket.set_reuseaddr(true)?;
    socket.bind(address)?;
    let listener = socket.listen(backlog)?;
    let local_addr = listener.local_addr()?;
    Ok((listener, local_addr))
}

async fn accept_loop(inner: Arc<ServerInner>, listener: TcpListener, cancel: CancellationToken) {
    loop {
        select! {
            biased;

            _ = cancel.cancelled() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => inner.accept_connection(stream, peer_addr, &cancel),
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    inner.raise(NotificationKind::Error, None, format!("Accept failed: {}", e));
                    select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(ACCEPT_BACKOFF) => {}
                    }
                }
            },
        }
    }
    debug!("Accept loop exiting");
}
