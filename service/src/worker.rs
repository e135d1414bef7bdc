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

//! Connection worker implementation
//!
//! Each accepted socket is owned by one `ConnectionWorker` task, which:
//! - reads and frames inbound bytes, strictly in order
//! - answers Telnet negotiation requests inline
//! - performs writes queued through its control channel
//! - shuts the socket down when cancelled, closed or disconnected

use crate::types::ConnectionId;
use cmdwire_codec::{FramerEvent, LineFramer};
use futures::StreamExt;
use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

/// Control messages for the worker
#[derive(Debug)]
pub enum ControlMessage {
    /// Write text to the connection
    Send(String),
    /// Gracefully close the connection
    Close,
}

/// Why a worker exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The owning engine cancelled the worker
    Stopped,
    /// A close was requested through the control channel
    Closed,
    /// The peer closed its end
    PeerClosed,
    /// A read or protocol write failed
    Error(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "server stopped"),
            Self::Closed => write!(f, "connection closed"),
            Self::PeerClosed => write!(f, "connection closed by peer"),
            Self::Error(reason) => write!(f, "connection error: {}", reason),
        }
    }
}

/// Callbacks a worker makes into its owning engine.
///
/// Called inline on the worker task; implementations must not block.
pub trait WorkerEvents: Send + Sync + 'static {
    /// A complete command line arrived
    fn line_received(&self, id: ConnectionId, line: String);

    /// A queued write finished; `Ok` carries the number of bytes written
    fn write_completed(&self, id: ConnectionId, text: &str, result: io::Result<usize>);

    /// The worker exited and its socket is shut down
    fn connection_closed(&self, id: ConnectionId, reason: CloseReason);
}

/// Connection worker that manages a single connection's lifecycle
pub struct ConnectionWorker<E: WorkerEvents> {
    id: ConnectionId,
    reader: FramedRead<OwnedReadHalf, LineFramer>,
    writer: OwnedWriteHalf,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    cancel: CancellationToken,
    events: Arc<E>,
}

impl<E: WorkerEvents> ConnectionWorker<E> {
    /// Create a worker owning `stream`
    pub fn new(
        id: ConnectionId,
        stream: TcpStream,
        receive_buffer_size: usize,
        control_rx: mpsc::UnboundedReceiver<ControlMessage>,
        cancel: CancellationToken,
        events: Arc<E>,
    ) -> Self {
        let (read_half, writer) = stream.into_split();
        Self {
            id,
            reader: FramedRead::with_capacity(read_half, LineFramer::new(), receive_buffer_size),
            writer,
            control_rx,
            cancel,
            events,
        }
    }

    /// Run the worker until the connection ends
    #[instrument(name = "connection", skip_all, fields(connection_id = %self.id))]
    pub async fn run(mut self) {
        let reason = self.event_loop().await;
        debug!(%reason, "Connection worker exiting");

        if let Err(e) = self.writer.shutdown().await {
            trace!(error = %e, "Socket shutdown failed");
        }
        // Anything still queued can no longer be delivered
        self.control_rx.close();

        self.events.connection_closed(self.id, reason);
    }

    /// Write `bytes` unless the worker is cancelled first; `None` when cancelled
    async fn write_or_cancel(&mut self, bytes: &[u8]) -> Option<io::Result<()>> {
        select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.writer.write_all(bytes) => Some(result),
        }
    }

    async fn event_loop(&mut self) -> CloseReason {
        loop {
            select! {
                biased;

                _ = self.cancel.cancelled() => {
                    return CloseReason::Stopped;
                }

                msg = self.control_rx.recv() => {
                    match msg {
                        Some(ControlMessage::Send(text)) => {
                            let Some(result) = self.write_or_cancel(text.as_bytes()).await else {
                                return CloseReason::Stopped;
                            };
                            self.events
                                .write_completed(self.id, &text, result.map(|()| text.len()));
                        }
                        Some(ControlMessage::Close) | None => {
                            return CloseReason::Closed;
                        }
                    }
                }

                frame = self.reader.next() => {
                    match frame {
                        Some(Ok(FramerEvent::Line(line))) => {
                            self.events.line_received(self.id, line);
                        }
                        Some(Ok(FramerEvent::Negotiation(request))) => {
                            trace!(%request, "Answering negotiation");
                            match self.write_or_cancel(&request.response()).await {
                                Some(Ok(())) => {}
                                Some(Err(e)) => return CloseReason::Error(e.to_string()),
                                None => return CloseReason::Stopped,
                            }
                        }
                        Some(Err(e)) => {
                            return CloseReason::Error(e.to_string());
                        }
                        None => {
                            return CloseReason::PeerClosed;
                        }
                    }
                }
            }
        }
    }
}

impl<E: WorkerEvents> fmt::Debug for ConnectionWorker<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionWorker")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    #[derive(Debug, PartialEq)]
    enum Recorded {
        Line(String),
        Write(String, usize),
        Closed(CloseReason),
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Recorded>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Recorded> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl WorkerEvents for Recorder {
        fn line_received(&self, _id: ConnectionId, line: String) {
            self.events.lock().unwrap().push(Recorded::Line(line));
        }

        fn write_completed(&self, _id: ConnectionId, text: &str, result: io::Result<usize>) {
            let written = result.unwrap_or(0);
            self.events
                .lock()
                .unwrap()
                .push(Recorded::Write(text.to_string(), written));
        }

        fn connection_closed(&self, _id: ConnectionId, reason: CloseReason) {
            self.events.lock().unwrap().push(Recorded::Closed(reason));
        }
    }

    struct Harness {
        peer: TcpStream,
        control_tx: mpsc::UnboundedSender<ControlMessage>,
        cancel: CancellationToken,
        recorder: Arc<Recorder>,
        task: JoinHandle<()>,
    }

    async fn spawn_worker() -> Harness {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let recorder = Arc::new(Recorder::default());
        let worker = ConnectionWorker::new(
            ConnectionId::new(1),
            stream,
            64,
            control_rx,
            cancel.clone(),
            Arc::clone(&recorder),
        );
        let task = tokio::spawn(worker.run());

        Harness {
            peer,
            control_tx,
            cancel,
            recorder,
            task,
        }
    }

    #[tokio::test]
    async fn test_worker_frames_lines_until_peer_closes() {
        let mut h = spawn_worker().await;

        h.peer.write_all(b"first\r\nsecond\n\n").await.unwrap();
        h.peer.shutdown().await.unwrap();
        h.task.await.unwrap();

        assert_eq!(
            h.recorder.take(),
            vec![
                Recorded::Line("first".into()),
                Recorded::Line("second".into()),
                Recorded::Closed(CloseReason::PeerClosed),
            ]
        );
    }

    #[tokio::test]
    async fn test_worker_answers_negotiation() {
        let mut h = spawn_worker().await;

        h.peer.write_all(&[255, 253, 3, 255, 253, 1]).await.unwrap();

        let mut response = [0u8; 6];
        tokio::time::timeout(Duration::from_secs(2), h.peer.read_exact(&mut response))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response, [255, 251, 3, 255, 252, 1]);

        h.cancel.cancel();
        h.task.await.unwrap();
        assert_eq!(h.recorder.take(), vec![Recorded::Closed(CloseReason::Stopped)]);
    }

    #[tokio::test]
    async fn test_worker_writes_queued_text() {
        let mut h = spawn_worker().await;

        h.control_tx
            .send(ControlMessage::Send("ping\n".into()))
            .unwrap();
        h.control_tx.send(ControlMessage::Close).unwrap();
        h.task.await.unwrap();

        let mut received = Vec::new();
        h.peer.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"ping\n");
        assert_eq!(
            h.recorder.take(),
            vec![
                Recorded::Write("ping\n".into(), 5),
                Recorded::Closed(CloseReason::Closed),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_interrupts_blocked_write() {
        let h = spawn_worker().await;

        // The peer never reads, so this write stalls once the socket buffers fill
        let flood = "x".repeat(32 * 1024 * 1024);
        h.control_tx.send(ControlMessage::Send(flood)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        h.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), h.task)
            .await
            .expect("worker stayed blocked in write")
            .unwrap();
        assert_eq!(h.recorder.take(), vec![Recorded::Closed(CloseReason::Stopped)]);
    }
}
