use super::{describe_byte, frame, latin1, AlignmentMode, ProtocolError, ACK, NAK, TERMINATOR};
use crate::port::{open_channel, Channel, PortConfig};

use log::{debug, warn};

/// Upper bound on a `#`-terminated reply, terminator included.
pub const DEFAULT_MAX_REPLY_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
}

/// Reply to a command answering with a status byte, optionally followed by a
/// `#`-terminated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReply {
    pub code: u8,
    pub message: Option<String>,
}

enum Handshake {
    Mode(AlignmentMode),
    Echo,
}

/// Frames commands, moves them over a [`Channel`] and decodes the replies.
///
/// Not safe to share: one caller drives a client at a time. There is no
/// background work; every call blocks until the channel's timeouts expire at
/// the latest.
pub struct ProtocolClient {
    channel: Option<Box<dyn Channel>>,
    alignment: Option<AlignmentMode>,
    last_error: Option<ProtocolError>,
    max_reply_len: usize,
}

impl Default for ProtocolClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolClient {
    pub fn new() -> Self {
        Self {
            channel: None,
            alignment: None,
            last_error: None,
            max_reply_len: DEFAULT_MAX_REPLY_LEN,
        }
    }

    pub fn with_max_reply_len(mut self, max_reply_len: usize) -> Self {
        self.max_reply_len = max_reply_len.max(1);
        self
    }

    pub fn state(&self) -> ConnectionState {
        match self.channel {
            Some(_) => ConnectionState::Connected,
            None => ConnectionState::Unconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn port_name(&self) -> Option<&str> {
        self.channel.as_ref().map(|channel| channel.name())
    }

    /// Mounting mode seen by the last handshake or set explicitly.
    pub fn alignment(&self) -> Option<AlignmentMode> {
        self.alignment
    }

    /// Failure swallowed by the last boolean command that returned `false`.
    pub fn last_error(&self) -> Option<&ProtocolError> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<ProtocolError> {
        self.last_error.take()
    }

    /// Opens the channel `config` describes and checks that a telescope answers.
    pub fn connect(&mut self, config: &PortConfig) -> Result<Option<AlignmentMode>, ProtocolError> {
        self.close()?;
        let channel = open_channel(config)?;
        self.connect_channel(channel)
    }

    /// Runs the alignment handshake over `channel` and keeps it on success.
    /// On failure the channel is closed before returning.
    pub fn connect_channel(
        &mut self,
        mut channel: Box<dyn Channel>,
    ) -> Result<Option<AlignmentMode>, ProtocolError> {
        self.close()?;

        if channel.is_simulated() {
            warn!(
                "{}: simulated telescope, boolean replies are not checked",
                channel.name()
            );
        }

        match handshake(channel.as_mut()) {
            Ok(reply) => {
                self.alignment = match reply {
                    Handshake::Mode(mode) => Some(mode),
                    Handshake::Echo => None,
                };
                debug!("connect OK: {} ({:?})", channel.name(), self.alignment);
                self.last_error = None;
                self.channel = Some(channel);
                Ok(self.alignment)
            }
            Err(e) => {
                if let Err(close_error) = channel.close() {
                    debug!("close after failed handshake: {}", close_error);
                }
                Err(e)
            }
        }
    }

    /// Releases the channel. Closing an unconnected client does nothing.
    pub fn close(&mut self) -> Result<(), ProtocolError> {
        self.alignment = None;
        match self.channel.take() {
            Some(mut channel) => {
                debug!("close: {}", channel.name());
                Ok(channel.close()?)
            }
            None => Ok(()),
        }
    }

    /// Sends a command that has no reply.
    pub fn send_only(&mut self, mnemonic: &str, args: &[&str]) -> Result<(), ProtocolError> {
        let channel = self.connected_channel()?;
        let bytes = frame(mnemonic, args)?;
        write_frame(channel.as_mut(), &bytes)
    }

    /// Sends a command answered by a single `'0'`/`'1'` byte.
    ///
    /// Only connection state and argument errors are returned. Transport
    /// failures, a missing reply and NAK all read as `false` and are kept in
    /// [`last_error`](Self::last_error).
    pub fn send_for_bool(&mut self, mnemonic: &str, args: &[&str]) -> Result<bool, ProtocolError> {
        self.last_error = None;
        let channel = self.connected_channel()?;
        let bytes = frame(mnemonic, args)?;
        let simulated = channel.is_simulated();
        let outcome = exchange_byte(channel.as_mut(), &bytes);

        if simulated {
            return Ok(self.accept_simulated(mnemonic, outcome));
        }

        let failure = match outcome {
            Ok(Some(NAK)) => ProtocolError::Busy {
                mnemonic: mnemonic.to_string(),
            },
            Ok(Some(byte)) => return Ok(decode_bool(byte)),
            Ok(None) => ProtocolError::TruncatedReply {
                mnemonic: mnemonic.to_string(),
                received: String::new(),
            },
            Err(e) => e,
        };
        debug!("{} failed: {}", mnemonic, failure);
        self.last_error = Some(failure);
        Ok(false)
    }

    /// Sends a command answered by text ending in `#`; the terminator is
    /// stripped. Reading stops at the terminator, at end of stream or read
    /// timeout, or after `max_reply_len` bytes. On overrun the rest of the
    /// reply, up to another `max_reply_len` bytes, is read and dropped so the
    /// next command starts on a fresh reply.
    pub fn send_for_string(&mut self, mnemonic: &str, args: &[&str]) -> Result<String, ProtocolError> {
        let max_len = self.max_reply_len;
        let channel = self.connected_channel()?;
        let bytes = frame(mnemonic, args)?;
        write_frame(channel.as_mut(), &bytes)?;
        read_to_terminator(channel.as_mut(), mnemonic, max_len)
    }

    /// Sends a command answered by one status byte. `ok` ends the reply;
    /// any other byte is followed by a `#`-terminated message.
    pub fn send_for_status(
        &mut self,
        mnemonic: &str,
        args: &[&str],
        ok: u8,
    ) -> Result<StatusReply, ProtocolError> {
        let max_len = self.max_reply_len;
        let channel = self.connected_channel()?;
        let bytes = frame(mnemonic, args)?;

        let code = match exchange_byte(channel.as_mut(), &bytes)? {
            Some(NAK) => {
                return Err(ProtocolError::Busy {
                    mnemonic: mnemonic.to_string(),
                })
            }
            Some(code) => code,
            None => {
                return Err(ProtocolError::TruncatedReply {
                    mnemonic: mnemonic.to_string(),
                    received: String::new(),
                })
            }
        };

        let message = if code == ok {
            None
        } else {
            Some(read_to_terminator(channel.as_mut(), mnemonic, max_len)?)
        };
        Ok(StatusReply { code, message })
    }

    /// Asks the mount for its alignment mode again. An ACK echo leaves the
    /// cached mode as it was.
    pub fn query_alignment(&mut self) -> Result<Option<AlignmentMode>, ProtocolError> {
        let channel = self.connected_channel()?;
        match handshake(channel.as_mut())? {
            Handshake::Mode(mode) => self.alignment = Some(mode),
            Handshake::Echo => debug!("alignment query echoed, keeping {:?}", self.alignment),
        }
        Ok(self.alignment)
    }

    pub fn set_alignment_mode(&mut self, mode: AlignmentMode) -> Result<(), ProtocolError> {
        let code = mode.code().to_string();
        self.send_only("A", &[&code])?;
        self.alignment = Some(mode);
        Ok(())
    }

    fn connected_channel(&mut self) -> Result<&mut Box<dyn Channel>, ProtocolError> {
        self.channel.as_mut().ok_or(ProtocolError::NotConnected)
    }

    fn accept_simulated(
        &mut self,
        mnemonic: &str,
        outcome: Result<Option<u8>, ProtocolError>,
    ) -> bool {
        match outcome {
            Ok(byte) => debug!("{}: simulated, accepting {}", mnemonic, describe_byte(byte)),
            Err(e) => {
                debug!("{}: simulated, accepting failure {}", mnemonic, e);
                self.last_error = Some(e);
            }
        }
        true
    }
}

impl Drop for ProtocolClient {
    fn drop(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            let _ = channel.close();
        }
    }
}

fn decode_bool(byte: u8) -> bool {
    byte == b'1'
}

fn write_frame(channel: &mut dyn Channel, bytes: &[u8]) -> Result<(), ProtocolError> {
    debug!("send {}", bytes.escape_ascii());
    Ok(channel.write_all(bytes)?)
}

fn exchange_byte(channel: &mut dyn Channel, bytes: &[u8]) -> Result<Option<u8>, ProtocolError> {
    write_frame(channel, bytes)?;
    let reply = channel.read_byte()?;
    debug!("recv {}", describe_byte(reply));
    Ok(reply)
}

fn read_to_terminator(
    channel: &mut dyn Channel,
    mnemonic: &str,
    max_len: usize,
) -> Result<String, ProtocolError> {
    let mut received = Vec::new();

    while received.len() < max_len {
        match channel.read_byte()? {
            Some(TERMINATOR) => {
                debug!("recv {}#", received.escape_ascii());
                return Ok(latin1(&received));
            }
            Some(NAK) if received.is_empty() => {
                debug!("recv NAK");
                return Err(ProtocolError::Busy {
                    mnemonic: mnemonic.to_string(),
                });
            }
            Some(byte) => received.push(byte),
            None => break,
        }
    }

    debug!("recv {} (unterminated)", received.escape_ascii());
    if received.len() >= max_len {
        let dropped = discard_to_terminator(channel, max_len)?;
        debug!("dropped {} bytes of overlong reply", dropped);
    }
    Err(ProtocolError::TruncatedReply {
        mnemonic: mnemonic.to_string(),
        received: latin1(&received),
    })
}

fn discard_to_terminator(channel: &mut dyn Channel, limit: usize) -> Result<usize, ProtocolError> {
    for dropped in 0..limit {
        match channel.read_byte()? {
            Some(TERMINATOR) => return Ok(dropped + 1),
            Some(_) => {}
            None => return Ok(dropped),
        }
    }
    Ok(limit)
}

fn handshake(channel: &mut dyn Channel) -> Result<Handshake, ProtocolError> {
    debug!("send ACK");
    channel.write_all(&[ACK])?;
    let reply = channel.read_byte()?;
    debug!("recv {}", describe_byte(reply));

    let accepted = match reply {
        Some(ACK) => Some(Handshake::Echo),
        Some(byte) => AlignmentMode::from_byte(byte).map(Handshake::Mode),
        None => None,
    };
    accepted.ok_or_else(|| ProtocolError::NotATelescope {
        port_name: channel.name().to_string(),
        reply: describe_byte(reply),
    })
}
