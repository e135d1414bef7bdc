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

//! Error types for the command service

use crate::types::ConnectionId;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Command service error types.
///
/// Transport failures on live connections are reported through the
/// notification bus; these errors only reach callers for misuse of the API.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the line framer
    #[error("Framing error: {0}")]
    Framer(#[from] cmdwire_codec::FramerError),

    /// `start` was called on an engine that is already running
    #[error("Service already running")]
    AlreadyRunning,

    /// The operation needs a running engine
    #[error("Service not running")]
    NotRunning,

    /// Connection with the given ID was not found
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// A configuration value or argument was rejected
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ServiceError {
    /// Check if the error is recoverable
    ///
    /// Recoverable errors are those where retrying the operation later might
    /// succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ServiceError::ConnectionClosed | ServiceError::Io(_))
    }

    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ServiceError::ConnectionNotFound(_)
                | ServiceError::ConnectionClosed
                | ServiceError::Io(_)
                | ServiceError::Framer(_)
        )
    }
}

/// Failure stages of the one-shot wake command.
///
/// Each stage has its own message so an operator can tell from the
/// `Wakeup` notification where the attempt stopped.
#[derive(Debug, Error)]
pub enum WakeupError {
    /// No host was given
    #[error("Wake command not sent: no host specified")]
    EmptyHost,

    /// Port zero was given
    #[error("Wake command not sent: invalid port 0 for host {0}")]
    InvalidPort(String),

    /// Name resolution failed or returned no address
    #[error("Wake command not sent: unable to resolve host {host}: {reason}")]
    Resolve {
        /// Host name that failed to resolve
        host: String,
        /// Resolver error or explanation
        reason: String,
    },

    /// The TCP connection could not be established
    #[error("Wake command not sent: unable to connect to {address}: {source}")]
    Connect {
        /// Address that refused or timed out
        address: SocketAddr,
        /// Underlying connect error
        source: std::io::Error,
    },

    /// The command could not be written
    #[error("Wake command to {address} failed: {source}")]
    Send {
        /// Address the command was written to
        address: SocketAddr,
        /// Underlying write error
        source: std::io::Error,
    },
}
