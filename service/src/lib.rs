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

//! cmdwire Command Server
//!
//! A line-oriented TCP command channel: remote peers connect, send text
//! commands terminated by `CR`, `LF` or `NUL`, and the host application reacts
//! to them and replies. Plain Telnet clients work too; their option
//! negotiation is answered and stripped from the stream.
//!
//! This crate holds the server engine and the pieces shared with the client
//! engine in `cmdwire-client`:
//!
//! - [`NotificationBus`] carries every event an engine raises
//! - [`Reply`] lets an observer answer the peer behind a notification
//! - [`ServiceStatus`] is the lifecycle both engines report
//!
//! # Architecture
//!
//! ```text
//! CommandServer ── accept loop
//!     │                 ↓
//!     │        ConnectionRegistry ← ConnectionWorker (one per socket)
//!     ↓                                     ↓
//! NotificationBus ← ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ LineFramer
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cmdwire_service::{CommandServer, LogObserver, NotificationKind, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = CommandServer::new(ServerConfig::default())?;
//!     server.bus().subscribe(LogObserver);
//!     server.start(9000).await?;
//!
//!     // Say hello to every client
//!     server.send("hello\n", None);
//!     server.stop();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod config;
mod error;
mod notification;
mod registry;
mod reply;
mod server;
mod status;
mod types;
mod wakeup;
mod worker;

pub use config::{DEFAULT_BACKLOG, ServerConfig};
pub use error::{Result, ServiceError, WakeupError};
pub use notification::{
    ChannelObserver, LogObserver, Notification, NotificationBus, NotificationKind,
    NotificationObserver, ObserverId,
};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use reply::{Reply, ReplySink, ReplyTarget};
pub use server::CommandServer;
pub use status::{ServiceStatus, StatusCell};
pub use types::{ConnectionId, ConnectionInfo};
pub use wakeup::{resolve_ipv4, send_wake_command};
pub use worker::{CloseReason, ConnectionWorker, ControlMessage, WorkerEvents};
