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

//! # cmdwire Line Framer
//!
//! This crate turns the raw byte stream of a command connection into discrete
//! command lines. It is a [`tokio_util::codec::Decoder`], so it plugs into
//! `FramedRead` the same way any other Tokio codec does.
//!
//! ## Framing
//!
//! Lines are terminated by any of `CR`, `LF` or `NUL`. Runs of terminators
//! collapse, and empty lines are never emitted.
//!
//! ## Telnet
//!
//! Peers are often plain Telnet clients which open with option negotiation.
//! The framer understands a small subset of RFC 854:
//!
//! - `IAC IAC` is a literal `0xFF` data byte.
//! - `IAC DO|DONT|WILL|WONT <option>` is surfaced as a [`Negotiation`], whose
//!   [`Negotiation::response`] accepts Suppress Go Ahead (RFC 858) and refuses
//!   everything else.
//! - Subnegotiations (`IAC SB ... IAC SE`) and other commands are discarded.
//!
//! ```rust
//! use bytes::BytesMut;
//! use cmdwire_codec::{FramerEvent, LineFramer, consts};
//! use tokio_util::codec::Decoder;
//!
//! let mut framer = LineFramer::new();
//! let mut input = BytesMut::from(&[consts::IAC, consts::DO, 3, b'h', b'i', b'\n'][..]);
//!
//! if let Some(FramerEvent::Negotiation(request)) = framer.decode(&mut input).unwrap() {
//!     assert_eq!(request.response(), [consts::IAC, consts::WILL, 3]);
//! }
//! assert_eq!(
//!     framer.decode(&mut input).unwrap(),
//!     Some(FramerEvent::Line("hi".to_string()))
//! );
//! ```
//!
//! ## Thread Safety
//!
//! `LineFramer` holds per-connection state and is meant to be owned by the
//! task reading that connection.

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

pub mod consts;
mod encoding;
mod framer;
mod negotiation;
mod result;

pub use self::encoding::{NEWLINE, TextEncoding, with_newline};
pub use self::framer::{DEFAULT_RECEIVE_BUFFER_SIZE, FramerEvent, LineFramer, line_to_string};
pub use self::negotiation::{Negotiation, TelnetVerb};
pub use self::result::{FramerError, FramerResult};
