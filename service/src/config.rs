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

//! Server configuration
//!
//! ```
//! use cmdwire_service::ServerConfig;
//! use std::net::Ipv4Addr;
//!
//! let config = ServerConfig::new()
//!     .with_bind_address(Ipv4Addr::LOCALHOST.into())
//!     .with_backlog(16)
//!     .with_max_connections(Some(8));
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{Result, ServiceError};
use cmdwire_codec::DEFAULT_RECEIVE_BUFFER_SIZE;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default listen backlog
pub const DEFAULT_BACKLOG: u32 = 4;

/// Command server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to listen on
    pub bind_address: IpAddr,

    /// Pending connection queue length passed to `listen`
    pub backlog: u32,

    /// Maximum live connections (None for unlimited)
    pub max_connections: Option<usize>,

    /// Initial capacity of each connection's read buffer
    pub receive_buffer_size: usize,

    /// Connect timeout for wake commands
    pub wake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            backlog: DEFAULT_BACKLOG,
            max_connections: None,
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            wake_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interface to listen on
    pub fn with_bind_address(mut self, address: IpAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Set the listen backlog
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the maximum number of live connections
    pub fn with_max_connections(mut self, max: Option<usize>) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-connection receive buffer size
    pub fn with_receive_buffer_size(mut self, size: usize) -> Self {
        self.receive_buffer_size = size;
        self
    }

    /// Set the wake command connect timeout
    pub fn with_wake_timeout(mut self, timeout: Duration) -> Self {
        self.wake_timeout = timeout;
        self
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.backlog == 0 {
            return Err(ServiceError::InvalidArgument(
                "backlog must be at least 1".into(),
            ));
        }
        if self.receive_buffer_size == 0 {
            return Err(ServiceError::InvalidArgument(
                "receive buffer size must be at least 1".into(),
            ));
        }
        if self.max_connections == Some(0) {
            return Err(ServiceError::InvalidArgument(
                "max connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
