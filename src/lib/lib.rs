//! Client for the Meade LX200 telescope serial command protocol.
//!
//! [`protocol::ProtocolClient`] frames `#:<mnemonic><args>#` commands, writes
//! them to a [`port::Channel`] and decodes one of three reply shapes. The
//! [`commands`] groups build on it and [`coords`] converts between degrees and
//! the firmware's sexagesimal text.

pub mod commands;
pub mod coords;
pub mod port;
pub mod protocol;
