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

//! Reply handles
//!
//! A [`Reply`] lets whoever consumes a notification answer the peer that caused
//! it without knowing which engine produced it. The destination is a tagged
//! [`ReplyTarget`], resolved by the engine when the reply is written, so a
//! reply to a connection that has since closed degrades to a `WriteFailed`
//! notification rather than an error.

use crate::types::ConnectionId;
use cmdwire_codec::with_newline;
use std::fmt;
use std::sync::Weak;
use tracing::debug;

/// Destination of a [`Reply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyTarget {
    /// A single server connection
    Connection(ConnectionId),
    /// Every connection registered on the server at write time
    Broadcast,
    /// The single peer of a client engine
    Peer,
}

impl fmt::Display for ReplyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(id) => write!(f, "{}", id),
            Self::Broadcast => write!(f, "broadcast"),
            Self::Peer => write!(f, "peer"),
        }
    }
}

/// An engine that can route text to a [`ReplyTarget`]
pub trait ReplySink: Send + Sync {
    /// Send `text` to `target`. Must not block.
    fn deliver(&self, target: ReplyTarget, text: &str);
}

/// A capability to send text back to the origin of a notification.
///
/// Replies hold the engine weakly; once the engine is dropped, writes are
/// discarded.
#[derive(Clone)]
pub struct Reply {
    target: ReplyTarget,
    sink: Weak<dyn ReplySink>,
}

impl Reply {
    /// Create a reply routed through `sink`
    pub fn new(target: ReplyTarget, sink: Weak<dyn ReplySink>) -> Self {
        Self { target, sink }
    }

    /// Destination of this reply
    pub fn target(&self) -> ReplyTarget {
        self.target
    }

    /// Write `text` as-is
    pub fn write(&self, text: &str) {
        match self.sink.upgrade() {
            Some(sink) => sink.deliver(self.target, text),
            None => debug!(target = %self.target, "Reply dropped, engine no longer exists"),
        }
    }

    /// Write `text` followed by the platform newline
    pub fn write_line(&self, text: &str) {
        self.write(&with_newline(text));
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("target", &self.target)
            .field("attached", &(self.sink.strong_count() > 0))
            .finish()
    }
}
