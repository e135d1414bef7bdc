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

//! Telnet and line framing byte constants

/// Null, accepted as a line terminator
pub const NUL: u8 = 0x00;
/// Line Feed
pub const LF: u8 = 0x0A;
/// Carriage Return
pub const CR: u8 = 0x0D;

/// Subnegotiation End
pub const SE: u8 = 0xF0;
/// No Operation
pub const NOP: u8 = 0xF1;
/// Go Ahead
pub const GA: u8 = 0xF9;
/// Subnegotiation Begin
pub const SB: u8 = 0xFA;
/// Sender wants to enable an option
pub const WILL: u8 = 0xFB;
/// Sender refuses to enable an option
pub const WONT: u8 = 0xFC;
/// Sender asks the receiver to enable an option
pub const DO: u8 = 0xFD;
/// Sender asks the receiver not to enable an option
pub const DONT: u8 = 0xFE;
/// Interpret As Command
pub const IAC: u8 = 0xFF;

/// Telnet option codes referenced by the framer
pub mod option {
    /// Echo (RFC 857)
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead (RFC 858), the only option this channel accepts
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
    /// Terminal Type (RFC 1091)
    pub const TERMINAL_TYPE: u8 = 24;
    /// Negotiate About Window Size (RFC 1073)
    pub const NAWS: u8 = 31;
    /// Linemode (RFC 1184)
    pub const LINEMODE: u8 = 34;
}
