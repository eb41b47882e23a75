mod client;

use std::{fmt::Display, io, str::FromStr};
use thiserror::Error;

pub use client::{ConnectionState, ProtocolClient, StatusReply, DEFAULT_MAX_REPLY_LEN};

/// Alignment query byte. Sent raw, outside command framing.
pub const ACK: u8 = 0x06;
/// Busy reply from LX200GPS firmware; the command should be retried.
pub const NAK: u8 = 0x15;
/// Frame and string reply terminator.
pub const TERMINATOR: u8 = b'#';
pub const MAX_MNEMONIC_LEN: usize = 3;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("can't open {port_name:?}: {reason}")]
    Connection { port_name: String, reason: String },
    #[error("{port_name:?} doesn't appear to be connected to an LX200; handshake returned {reply}")]
    NotATelescope { port_name: String, reply: String },
    #[error("telescope not connected")]
    NotConnected,
    #[error("reply to {mnemonic:?} ended without '#' after {received:?}")]
    TruncatedReply { mnemonic: String, received: String },
    #[error("unsupported argument: {0}")]
    UnsupportedArgument(String),
    #[error("telescope busy, {mnemonic:?} refused")]
    Busy { mnemonic: String },
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Errors a caller may reasonably retry the same command after.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProtocolError::Busy { .. } | ProtocolError::TruncatedReply { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMode {
    AltAz,
    Land,
    Polar,
}

impl AlignmentMode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'A' => Some(AlignmentMode::AltAz),
            b'L' => Some(AlignmentMode::Land),
            b'P' => Some(AlignmentMode::Polar),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            AlignmentMode::AltAz => 'A',
            AlignmentMode::Land => 'L',
            AlignmentMode::Polar => 'P',
        }
    }
}

impl Display for AlignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentMode::AltAz => "AltAz".fmt(f),
            AlignmentMode::Land => "Land".fmt(f),
            AlignmentMode::Polar => "Polar".fmt(f),
        }
    }
}

impl FromStr for AlignmentMode {
    type Err = ProtocolError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "a" | "altaz" => Ok(AlignmentMode::AltAz),
            "l" | "land" => Ok(AlignmentMode::Land),
            "p" | "polar" => Ok(AlignmentMode::Polar),
            _ => Err(ProtocolError::UnsupportedArgument(format!(
                "alignment mode '{}'",
                input
            ))),
        }
    }
}

/// Serializes a command as `#:<mnemonic><args>#`.
///
/// Arguments are already formatted by the caller. Each character becomes one
/// byte (Latin-1), which keeps the firmware's degree glyph 0xDF intact.
pub fn frame(mnemonic: &str, args: &[&str]) -> Result<Vec<u8>, ProtocolError> {
    let valid_mnemonic = !mnemonic.is_empty()
        && mnemonic.len() <= MAX_MNEMONIC_LEN
        && mnemonic
            .bytes()
            .all(|b| b.is_ascii_graphic() && b != TERMINATOR && b != b':');
    if !valid_mnemonic {
        return Err(ProtocolError::UnsupportedArgument(format!(
            "mnemonic {:?}",
            mnemonic
        )));
    }

    let args_len: usize = args.iter().map(|arg| arg.len()).sum();
    let mut buffer = Vec::with_capacity(3 + mnemonic.len() + args_len);
    buffer.extend_from_slice(b"#:");
    buffer.extend_from_slice(mnemonic.as_bytes());

    for arg in args {
        for c in arg.chars() {
            match u8::try_from(u32::from(c)) {
                Ok(byte) if byte != TERMINATOR => buffer.push(byte),
                _ => {
                    return Err(ProtocolError::UnsupportedArgument(format!(
                        "{:?} in argument {:?} to {}",
                        c, arg, mnemonic
                    )))
                }
            }
        }
    }

    buffer.push(TERMINATOR);
    Ok(buffer)
}

/// Renders a reply byte (or its absence) for error messages.
pub(crate) fn describe_byte(byte: Option<u8>) -> String {
    match byte {
        Some(b) if b.is_ascii_graphic() => format!("'{}'", b as char),
        Some(b) => format!("{:#04x}", b),
        None => "nothing".to_string(),
    }
}

pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
