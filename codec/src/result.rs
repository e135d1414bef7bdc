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

/// Result Type for Framer Operations
pub type FramerResult<T> = Result<T, FramerError>;

/// Errors surfaced while framing a byte stream.
///
/// The framer itself never rejects input; malformed Telnet sequences are
/// skipped. The only failures come from the transport it is reading from.
#[derive(Debug, thiserror::Error)]
pub enum FramerError {
    /// An I/O error occurred while reading from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FramerError {
    /// The I/O error kind behind this failure
    pub fn kind(&self) -> std::io::ErrorKind {
        match self {
            FramerError::Io(error) => error.kind(),
        }
    }
}
