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

//! Outbound text encoding

use bytes::{BufMut, Bytes, BytesMut};

/// Platform newline appended to outbound lines
#[cfg(windows)]
pub const NEWLINE: &str = "\r\n";
/// Platform newline appended to outbound lines
#[cfg(not(windows))]
pub const NEWLINE: &str = "\n";

/// Character encoding used when writing text to a socket
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, used by the server engine
    #[default]
    Utf8,
    /// 7-bit ASCII, used by the client engine. Non-ASCII characters become `?`.
    Ascii,
}

impl TextEncoding {
    /// Encode `text` into wire bytes
    pub fn encode(self, text: &str) -> Bytes {
        match self {
            TextEncoding::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
            TextEncoding::Ascii => {
                let mut buffer = BytesMut::with_capacity(text.len());
                for ch in text.chars() {
                    buffer.put_u8(if ch.is_ascii() { ch as u8 } else { b'?' });
                }
                buffer.freeze()
            }
        }
    }
}

/// Append the platform newline to `text`
pub fn with_newline(text: &str) -> String {
    let mut line = String::with_capacity(text.len() + NEWLINE.len());
    line.push_str(text);
    line.push_str(NEWLINE);
    line
}
