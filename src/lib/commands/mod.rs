//! Command groups of the LX200 protocol, built on [`ProtocolClient`].
//!
//! Each group borrows the client for its lifetime and retries commands the
//! firmware refused as busy (NAK) or left unterminated, up to `retries` extra
//! attempts.

mod accessories;
mod gps;
mod library;
mod pec;
mod telescope;

pub use accessories::{Derotator, Focuser, FocusSpeed, Reticule};
pub use gps::Gps;
pub use library::Library;
pub use pec::Pec;
pub use telescope::{Direction, HomeStatus, Precision, Slew, SlewRate, Telescope};

use log::warn;
use thiserror::Error;

use crate::coords::CoordError;
use crate::protocol::{AlignmentMode, ProtocolClient, ProtocolError};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("unreadable reply {reply:?} to {mnemonic}")]
    BadReply {
        mnemonic: &'static str,
        reply: String,
        source: CoordError,
    },
    #[error("unexpected reply {reply:?} to {mnemonic}")]
    UnexpectedReply { mnemonic: &'static str, reply: String },
    #[error("periodic error correction needs polar alignment, not {alignment:?}")]
    NotPolar { alignment: Option<AlignmentMode> },
}

pub type Result<T, E = CommandError> = std::result::Result<T, E>;

fn retrying<T>(
    retries: usize,
    mnemonic: &str,
    mut attempt: impl FnMut() -> Result<T, ProtocolError>,
) -> Result<T, ProtocolError> {
    let mut tries = 0;
    loop {
        match attempt() {
            Err(e) if e.is_retryable() && tries < retries => {
                tries += 1;
                warn!("{}: {}, retry {}/{}", mnemonic, e, tries, retries);
            }
            result => return result,
        }
    }
}

pub(crate) fn query(
    client: &mut ProtocolClient,
    retries: usize,
    mnemonic: &str,
    args: &[&str],
) -> Result<String, ProtocolError> {
    retrying(retries, mnemonic, || client.send_for_string(mnemonic, args))
}

/// Boolean command; a `false` caused by a retryable failure is retried.
pub(crate) fn confirm(
    client: &mut ProtocolClient,
    retries: usize,
    mnemonic: &str,
    args: &[&str],
) -> Result<bool, ProtocolError> {
    let mut tries = 0;
    loop {
        let accepted = client.send_for_bool(mnemonic, args)?;
        let retry = !accepted
            && tries < retries
            && client
                .last_error()
                .map_or(false, ProtocolError::is_retryable);
        if !retry {
            return Ok(accepted);
        }
        tries += 1;
        warn!("{}: refused, retry {}/{}", mnemonic, tries, retries);
    }
}

/// Reads a reply with `parse`, keeping the raw text on failure.
pub(crate) fn parse_reply(
    mnemonic: &'static str,
    reply: String,
    parse: fn(&str) -> Result<f64, CoordError>,
) -> Result<f64> {
    parse(&reply).map_err(|source| CommandError::BadReply {
        mnemonic,
        reply,
        source,
    })
}

/// Rejects `value` outside `range` before anything reaches the wire.
pub(crate) fn check_range(
    what: &str,
    value: u32,
    range: std::ops::RangeInclusive<u32>,
) -> Result<u32, ProtocolError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ProtocolError::UnsupportedArgument(format!(
            "{} {} outside {}..={}",
            what,
            value,
            range.start(),
            range.end()
        )))
    }
}
