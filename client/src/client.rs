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

//! Command client implementation

use crate::{ClientConfig, ClientError, Result};
use cmdwire_codec::{FramerEvent, LineFramer, TextEncoding};
use cmdwire_service::{
    NotificationBus, NotificationKind, Reply, ReplySink, ReplyTarget, ServiceStatus, StatusCell,
    resolve_ipv4,
};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::runtime::Handle;
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Single-peer line command client
///
/// The client connects to one server, reports every received line on its
/// [`NotificationBus`] and writes text to the server as ASCII. It never
/// reconnects on its own; call [`start`](Self::start) again after it stops.
///
/// # Example
///
/// ```no_run
/// use cmdwire_client::{ClientConfig, CommandClient};
/// use cmdwire_service::LogObserver;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = CommandClient::new(ClientConfig::new("mediapc", 9000))?;
///     client.bus().subscribe(LogObserver);
///     client.start(false)?;
///
///     client.send("launch notepad.exe\n", None);
///     tokio::signal::ctrl_c().await?;
///     client.stop();
///     Ok(())
/// }
/// ```
pub struct CommandClient {
    inner: Arc<ClientInner>,
}

impl CommandClient {
    /// Create a stopped client with its own notification bus
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_bus(config, NotificationBus::new())
    }

    /// Create a stopped client publishing on `bus`
    pub fn with_bus(config: ClientConfig, bus: NotificationBus) -> Result<Self> {
        config.validate()?;
        let inner = Arc::new_cyclic(|this| ClientInner {
            config,
            bus,
            status: StatusCell::default(),
            session: Mutex::new(None),
            generation: AtomicU64::new(0),
            this: this.clone(),
        });
        Ok(Self { inner })
    }

    /// Begin connecting in the background.
    ///
    /// With `delay` set and a configured start delay, the client sleeps first.
    /// Requires a Tokio runtime. Returns [`ClientError::AlreadyRunning`] while
    /// a previous session is still active.
    pub fn start(&self, delay: bool) -> Result<()> {
        self.inner.start(delay)
    }

    /// Cancel the session and close the socket. Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Send `text` to the server.
    ///
    /// Silently does nothing unless connected. The client has a single peer,
    /// so `reply` is accepted only for symmetry with the server.
    pub fn send(&self, text: &str, reply: Option<&Reply>) {
        if let Some(reply) = reply {
            debug!(target = %reply.target(), "Client ignores reply routing");
        }
        self.inner.enqueue(text);
    }

    /// A reply handle addressed to the server
    pub fn reply(&self) -> Reply {
        self.inner.reply()
    }

    /// Current status
    pub fn status(&self) -> ServiceStatus {
        self.inner.status.get()
    }

    /// Check if a connection is established
    pub fn is_connected(&self) -> bool {
        self.status() == ServiceStatus::Connected
    }

    /// The bus this client publishes on
    pub fn bus(&self) -> &NotificationBus {
        &self.inner.bus
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl Drop for CommandClient {
    fn drop(&mut self) {
        if self.inner.status.get().is_running() {
            warn!("CommandClient dropped while still running");
        }
        self.inner.stop();
    }
}

impl std::fmt::Debug for CommandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandClient")
            .field("address", &self.inner.config.address())
            .field("status", &self.status())
            .finish()
    }
}

/// One start..stop run of the client
struct Session {
    generation: u64,
    cancel: CancellationToken,
    outgoing: mpsc::UnboundedSender<String>,
}

struct ClientInner {
    config: ClientConfig,
    bus: NotificationBus,
    status: StatusCell,
    session: Mutex<Option<Session>>,
    generation: AtomicU64,
    this: Weak<ClientInner>,
}

impl ClientInner {
    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn raise(&self, kind: NotificationKind, reply: Option<Reply>, message: impl Into<String>) {
        self.bus.raise(kind, self.status.get(), reply, message);
    }

    fn set_status(&self, status: ServiceStatus, message: impl Into<String>) {
        if self.status.swap(status) != status {
            self.raise(NotificationKind::StatusChange, None, message);
        }
    }

    fn reply(&self) -> Reply {
        let sink: Weak<dyn ReplySink> = self.this.clone();
        Reply::new(ReplyTarget::Peer, sink)
    }

    fn start(self: &Arc<Self>, delay: bool) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        {
            let mut slot = self.lock_session();
            if slot.is_some() {
                return Err(ClientError::AlreadyRunning);
            }
            *slot = Some(Session {
                generation,
                cancel: cancel.clone(),
                outgoing: outgoing_tx,
            });
        }

        self.raise(
            NotificationKind::Initialized,
            None,
            format!("Starting client for {}", self.config.address()),
        );
        runtime.spawn(Arc::clone(self).run(generation, delay, cancel, outgoing_rx));
        Ok(())
    }

    fn stop(&self) {
        let changed = {
            let mut slot = self.lock_session();
            if let Some(session) = slot.take() {
                session.cancel.cancel();
                info!(address = %self.config.address(), "Client stopped");
            }
            self.status.swap(ServiceStatus::Stopped) != ServiceStatus::Stopped
        };
        if changed {
            self.raise(NotificationKind::StatusChange, None, "Client stopped");
        }
    }

    fn enqueue(&self, text: &str) {
        if self.status.get() != ServiceStatus::Connected {
            debug!("Not connected, dropping outgoing text");
            return;
        }
        if let Some(session) = self.lock_session().as_ref() {
            // A closed channel means the session is already ending
            let _ = session.outgoing.send(text.to_string());
        }
    }

    #[instrument(name = "client", skip_all, fields(address = %self.config.address()))]
    async fn run(
        self: Arc<Self>,
        generation: u64,
        delay: bool,
        cancel: CancellationToken,
        outgoing: mpsc::UnboundedReceiver<String>,
    ) {
        select! {
            biased;
            // Cancellation by stop() is not an error
            _ = cancel.cancelled() => debug!("Session cancelled"),
            _ = self.session(delay, outgoing) => {}
        }

        if cancel.is_cancelled() {
            return;
        }
        // Stopped is stored under the session lock so a following start() cannot
        // have its status overwritten by this run
        let changed = {
            let mut slot = self.lock_session();
            match slot.as_ref() {
                Some(session) if session.generation == generation => {
                    slot.take();
                    self.status.swap(ServiceStatus::Stopped) != ServiceStatus::Stopped
                }
                _ => false,
            }
        };
        if changed {
            self.raise(NotificationKind::StatusChange, None, "Client stopped");
        }
    }

    async fn session(&self, delay: bool, mut outgoing: mpsc::UnboundedReceiver<String>) {
        if delay {
            if let Some(start_delay) = self.config.start_delay {
                self.set_status(
                    ServiceStatus::Sleeping,
                    format!("Waiting {:?} before connecting", start_delay),
                );
                sleep(start_delay).await;
            }
        }

        let address = match self.resolve().await {
            Ok(address) => address,
            Err(e) => {
                warn!(error = %e, "Resolution failed");
                self.raise(NotificationKind::Error, None, e.to_string());
                return;
            }
        };
        self.set_status(ServiceStatus::Started, address.to_string());

        let stream = match self.connect(address).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(%address, error = %e, "Connect failed");
                self.raise(
                    NotificationKind::Error,
                    None,
                    format!("Unable to connect to {}: {}", address, e),
                );
                return;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Unable to set TCP_NODELAY");
        }

        let (read_half, mut writer) = stream.into_split();
        let mut reader = FramedRead::with_capacity(
            read_half,
            LineFramer::new(),
            self.config.receive_buffer_size,
        );

        info!(%address, "Client connected");
        self.set_status(ServiceStatus::Connected, format!("Connected to {}", address));
        self.raise(
            NotificationKind::ClientConnected,
            Some(self.reply()),
            address.to_string(),
        );

        loop {
            select! {
                text = outgoing.recv() => {
                    let Some(text) = text else { break };
                    self.write(&mut writer, &text).await;
                }
                frame = reader.next() => match frame {
                    Some(Ok(FramerEvent::Line(line))) => {
                        self.raise(NotificationKind::ReceivedLine, Some(self.reply()), line);
                    }
                    Some(Ok(FramerEvent::Negotiation(request))) => {
                        if let Err(e) = writer.write_all(&request.response()).await {
                            self.raise(
                                NotificationKind::Error,
                                None,
                                format!("Unable to answer {}: {}", request, e),
                            );
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        self.raise(NotificationKind::Error, None, format!("Read failed: {}", e));
                        break;
                    }
                    None => {
                        info!(%address, "Server closed connection");
                        self.raise(
                            NotificationKind::Error,
                            None,
                            "connection closed by remote host",
                        );
                        break;
                    }
                },
            }
        }
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        let host = &self.config.host;
        match resolve_ipv4(host, self.config.port).await {
            Ok(Some(address)) => Ok(address),
            Ok(None) => Err(ClientError::Resolve(format!("{}: no IPv4 address", host))),
            Err(e) => Err(ClientError::Resolve(format!("{}: {}", host, e))),
        }
    }

    async fn connect(&self, address: SocketAddr) -> Result<TcpStream> {
        match timeout(self.config.connect_timeout, TcpStream::connect(address)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connect timed out",
            ))),
        }
    }

    async fn write(&self, writer: &mut OwnedWriteHalf, text: &str) {
        let bytes = TextEncoding::Ascii.encode(text);
        match writer.write_all(&bytes).await {
            Ok(()) if !bytes.is_empty() => {
                self.raise(NotificationKind::Write, Some(self.reply()), text.trim());
            }
            Ok(()) => {
                self.raise(NotificationKind::WriteFailed, None, "Nothing to write");
            }
            Err(e) => {
                self.raise(NotificationKind::Error, None, format!("Write failed: {}", e));
            }
        }
    }
}

impl ReplySink for ClientInner {
    fn deliver(&self, _target: ReplyTarget, text: &str) {
        self.enqueue(text);
    }
}
