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

use crate::{FramerError, Negotiation, TelnetVerb, consts};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{debug, trace, warn};

/// Size of the raw read buffer each connection decodes from
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 1024;

/// An event produced by the [`LineFramer`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FramerEvent {
    /// A complete, non-empty command line without its terminator
    Line(String),
    /// A Telnet option request that must be answered on the same connection
    Negotiation(Negotiation),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum DecoderState {
    #[default]
    NormalData,
    InterpretAsCommand,
    Negotiate(TelnetVerb),
    Subnegotiate,
    SubnegotiateIAC,
}

/// Stateful byte-stream to command-line decoder.
///
/// `LineFramer` accumulates bytes into a line buffer and emits a
/// [`FramerEvent::Line`] whenever a `CR`, `LF` or `NUL` terminates a non-empty
/// buffer. Consecutive terminators collapse, so `CRLF` yields one line and a
/// line consisting only of terminators is never emitted.
///
/// Telnet sequences introduced by `IAC` are consumed transparently:
///
/// - `IAC IAC` appends a literal `0xFF` to the line.
/// - `IAC WILL|WONT|DO|DONT <option>` yields a [`FramerEvent::Negotiation`].
/// - `IAC SB ... IAC SE` is skipped.
/// - Any other `IAC <command>` is dropped.
///
/// Decoder state is kept between calls, so a sequence split across two reads
/// is reassembled.
///
/// # Example
/// ```
/// use bytes::BytesMut;
/// use cmdwire_codec::{FramerEvent, LineFramer};
/// use tokio_util::codec::Decoder;
///
/// let mut framer = LineFramer::new();
/// let mut input = BytesMut::from(&b"status\r\n"[..]);
/// let event = framer.decode(&mut input).unwrap();
/// assert_eq!(event, Some(FramerEvent::Line("status".to_string())));
/// ```
#[derive(Debug, Default)]
pub struct LineFramer {
    line: Vec<u8>,
    state: DecoderState,
}

impl LineFramer {
    /// Create a framer with an empty line buffer
    pub fn new() -> LineFramer {
        LineFramer::default()
    }

    /// Bytes received so far that have not been terminated yet
    pub fn pending(&self) -> &[u8] {
        &self.line
    }

    /// Whether the framer is in the middle of a Telnet command sequence
    pub fn is_mid_sequence(&self) -> bool {
        self.state != DecoderState::NormalData
    }

    /// Discard the line buffer and any partial Telnet sequence
    pub fn reset(&mut self) {
        self.line.clear();
        self.state = DecoderState::NormalData;
    }

    fn take_line(&mut self) -> Option<String> {
        if self.line.is_empty() {
            return None;
        }
        Some(line_to_string(std::mem::take(&mut self.line)))
    }
}

/// Convert raw line bytes to text.
///
/// Valid UTF-8 is kept as is. Otherwise every byte maps to the character with
/// the same code point, so a literal `0xFF` becomes `'ÿ'`.
pub fn line_to_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => error.into_bytes().into_iter().map(char::from).collect(),
    }
}

impl Decoder for LineFramer {
    type Item = FramerEvent;
    type Error = FramerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<FramerEvent>, Self::Error> {
        while src.has_remaining() {
            let byte = src.get_u8();
            match (self.state, byte) {
                (DecoderState::NormalData, consts::IAC) => {
                    self.state = DecoderState::InterpretAsCommand;
                }
                (DecoderState::NormalData, consts::CR | consts::LF | consts::NUL) => {
                    if let Some(line) = self.take_line() {
                        trace!(length = line.len(), "Line completed");
                        return Ok(Some(FramerEvent::Line(line)));
                    }
                }
                (DecoderState::NormalData, _) => {
                    self.line.push(byte);
                }
                (DecoderState::InterpretAsCommand, consts::IAC) => {
                    self.state = DecoderState::NormalData;
                    self.line.push(consts::IAC);
                }
                (DecoderState::InterpretAsCommand, consts::SB) => {
                    self.state = DecoderState::Subnegotiate;
                }
                (DecoderState::InterpretAsCommand, consts::WILL..=consts::DONT) => {
                    self.state = match TelnetVerb::from_u8(byte) {
                        Some(verb) => DecoderState::Negotiate(verb),
                        None => DecoderState::NormalData,
                    };
                }
                (DecoderState::InterpretAsCommand, _) => {
                    trace!("Ignoring Telnet command {:#X}", byte);
                    self.state = DecoderState::NormalData;
                }
                (DecoderState::Negotiate(verb), option) => {
                    self.state = DecoderState::NormalData;
                    let negotiation = Negotiation::new(verb, option);
                    debug!(request = %negotiation, "Telnet negotiation received");
                    return Ok(Some(FramerEvent::Negotiation(negotiation)));
                }
                (DecoderState::Subnegotiate, consts::IAC) => {
                    self.state = DecoderState::SubnegotiateIAC;
                }
                (DecoderState::Subnegotiate, _) => {}
                (DecoderState::SubnegotiateIAC, consts::SE) => {
                    self.state = DecoderState::NormalData;
                }
                (DecoderState::SubnegotiateIAC, consts::IAC) => {
                    self.state = DecoderState::Subnegotiate;
                }
                (DecoderState::SubnegotiateIAC, _) => {
                    warn!(
                        "Received invalid command during subnegotiation {:#X}. Aborting",
                        byte
                    );
                    self.state = DecoderState::NormalData;
                }
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<FramerEvent>, Self::Error> {
        let event = self.decode(buf)?;
        if event.is_none() && !self.line.is_empty() {
            debug!(
                length = self.line.len(),
                "Discarding unterminated line at end of stream"
            );
            self.reset();
        }
        Ok(event)
    }
}
