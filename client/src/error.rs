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

//! Client error types

use std::io;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A session is already active
    #[error("Client already running")]
    AlreadyRunning,

    /// `start` was called outside a Tokio runtime
    #[error("No Tokio runtime available")]
    NoRuntime,

    /// Host name did not resolve to an IPv4 address
    #[error("Unable to resolve {0}")]
    Resolve(String),
}

impl ClientError {
    /// Check if this is a connection-level failure
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Resolve(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ClientError::InvalidConfig("port must not be 0".into()).to_string(),
            "Invalid configuration: port must not be 0"
        );
        assert_eq!(
            ClientError::Resolve("nonexistent.invalid: no IPv4 address".into()).to_string(),
            "Unable to resolve nonexistent.invalid: no IPv4 address"
        );
    }

    #[test]
    fn test_error_from_io() {
        let err: ClientError = io::Error::from(io::ErrorKind::ConnectionRefused).into();
        assert!(err.is_connection_error());
        assert!(!ClientError::AlreadyRunning.is_connection_error());
    }
}
