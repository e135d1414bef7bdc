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

//! Engine lifecycle status

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Externally visible lifecycle of a server or client engine
/// (stored as atomic u8 for lock-free reads)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServiceStatus {
    /// Not listening and not connected
    Stopped = 0,
    /// Listening socket bound (server) or target resolved (client)
    Started = 1,
    /// Listening with no client yet (server only)
    Waiting = 2,
    /// At least one live connection
    Connected = 3,
    /// Delaying before the connection attempt (client only)
    Sleeping = 4,
}

impl ServiceStatus {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Started,
            2 => Self::Waiting,
            3 => Self::Connected,
            4 => Self::Sleeping,
            _ => Self::Stopped,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if the engine is doing anything at all
    pub fn is_running(self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Started => write!(f, "started"),
            Self::Waiting => write!(f, "waiting"),
            Self::Connected => write!(f, "connected"),
            Self::Sleeping => write!(f, "sleeping"),
        }
    }
}

/// Last-writer-wins holder for a [`ServiceStatus`].
///
/// Readers on other threads may observe the previous value for the duration
/// of one transition.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    /// Create a cell holding `status`
    pub fn new(status: ServiceStatus) -> Self {
        Self(AtomicU8::new(status.as_u8()))
    }

    /// Current status
    pub fn get(&self) -> ServiceStatus {
        ServiceStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store `status`, returning the previous value
    pub fn swap(&self, status: ServiceStatus) -> ServiceStatus {
        ServiceStatus::from_u8(self.0.swap(status.as_u8(), Ordering::AcqRel))
    }

    /// Move from `from` to `to` only if the cell still holds `from`
    pub fn transition(&self, from: ServiceStatus, to: ServiceStatus) -> bool {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new(ServiceStatus::Stopped)
    }
}
