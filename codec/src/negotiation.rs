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

use crate::consts;
use std::fmt;

/// One of the four Telnet option negotiation verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelnetVerb {
    /// `WILL` (251)
    Will,
    /// `WONT` (252)
    Wont,
    /// `DO` (253)
    Do,
    /// `DONT` (254)
    Dont,
}

impl TelnetVerb {
    /// Map a command byte to a negotiation verb, if it is one
    pub fn from_u8(byte: u8) -> Option<TelnetVerb> {
        match byte {
            consts::WILL => Some(TelnetVerb::Will),
            consts::WONT => Some(TelnetVerb::Wont),
            consts::DO => Some(TelnetVerb::Do),
            consts::DONT => Some(TelnetVerb::Dont),
            _ => None,
        }
    }

    /// Wire value of this verb
    pub fn as_u8(self) -> u8 {
        match self {
            TelnetVerb::Will => consts::WILL,
            TelnetVerb::Wont => consts::WONT,
            TelnetVerb::Do => consts::DO,
            TelnetVerb::Dont => consts::DONT,
        }
    }
}

impl fmt::Display for TelnetVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelnetVerb::Will => write!(f, "WILL"),
            TelnetVerb::Wont => write!(f, "WONT"),
            TelnetVerb::Do => write!(f, "DO"),
            TelnetVerb::Dont => write!(f, "DONT"),
        }
    }
}

/// A received `IAC <verb> <option>` request.
///
/// The channel accepts Suppress Go Ahead and refuses every other option. The
/// answer is computed here so that engines only have to write [`Negotiation::response`]
/// back on the socket the request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Negotiation {
    /// Verb sent by the peer
    pub verb: TelnetVerb,
    /// Option code the verb refers to
    pub option: u8,
}

impl Negotiation {
    /// Create a negotiation request
    pub fn new(verb: TelnetVerb, option: u8) -> Negotiation {
        Negotiation { verb, option }
    }

    /// Whether the option will be agreed to
    pub fn is_accepted(&self) -> bool {
        self.option == consts::option::SUPPRESS_GO_AHEAD
    }

    /// The verb to answer with.
    ///
    /// | received | SGA    | other  |
    /// |----------|--------|--------|
    /// | DO       | WILL   | WONT   |
    /// | DONT     | WONT   | WONT   |
    /// | WILL     | DO     | DONT   |
    /// | WONT     | DONT   | DONT   |
    pub fn answer(&self) -> TelnetVerb {
        match (self.verb, self.is_accepted()) {
            (TelnetVerb::Do, true) => TelnetVerb::Will,
            (TelnetVerb::Do | TelnetVerb::Dont, _) => TelnetVerb::Wont,
            (TelnetVerb::Will, true) => TelnetVerb::Do,
            (TelnetVerb::Will | TelnetVerb::Wont, _) => TelnetVerb::Dont,
        }
    }

    /// Raw `IAC <answer> <option>` bytes to send back
    pub fn response(&self) -> [u8; 3] {
        [consts::IAC, self.answer().as_u8(), self.option]
    }
}

impl fmt::Display for Negotiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.option)
    }
}
