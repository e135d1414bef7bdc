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

//! # cmdwire Command Client
//!
//! The client side of a cmdwire command channel: one outbound TCP connection
//! to a command server, with received lines and connection events reported on
//! the same [`NotificationBus`](cmdwire_service::NotificationBus) model the
//! server uses.
//!
//! ## Lifecycle
//!
//! ```text
//! Stopped → (Sleeping) → Started → Connected → Stopped
//! ```
//!
//! Any failure returns the client to `Stopped`; it never reconnects on its
//! own.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cmdwire_client::{ClientConfig, CommandClient};
//! use cmdwire_service::{Notification, NotificationKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CommandClient::new(ClientConfig::new("localhost", 9000))?;
//!     client.bus().subscribe(|n: &Notification| {
//!         if n.kind == NotificationKind::ReceivedLine {
//!             println!("server says: {}", n.message);
//!         }
//!     });
//!     client.start(false)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Encoding
//!
//! Outgoing text is sent as ASCII; characters outside ASCII become `?`.

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

mod client;
mod config;
mod error;

pub use client::CommandClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
