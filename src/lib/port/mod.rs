#[cfg(target_os = "linux")]
mod linux;
mod sim;

#[cfg(target_os = "linux")]
use linux::is_port_open;

pub use serialport::SerialPort;
pub use sim::SimulatedPort;

use core::time::Duration;
use log::debug;
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::io::{self, Read, Write};
use std::{fmt::Display, str::FromStr};

use crate::protocol::ProtocolError;

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(3);

/// Duplex byte stream to a telescope.
///
/// A channel (and the client owning it) must be driven by one caller at a
/// time. Nothing here locks; callers sharing a port serialize externally.
pub trait Channel: Send {
    /// Device identifier the channel was opened on.
    fn name(&self) -> &str;

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Next byte, or `None` once the stream ended or the read timeout expired.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Releases the stream. Closing twice is a no-op.
    fn close(&mut self) -> io::Result<()>;

    /// Whether replies are canned rather than produced by a device.
    fn is_simulated(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    B9600,
    B14400,
    B19200,
    B28800,
    B38400,
    B56700,
}

impl BaudRate {
    pub const ALL: [BaudRate; 9] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B14400,
        BaudRate::B19200,
        BaudRate::B28800,
        BaudRate::B38400,
        BaudRate::B56700,
    ];

    pub fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B14400 => 14400,
            BaudRate::B19200 => 19200,
            BaudRate::B28800 => 28800,
            BaudRate::B38400 => 38400,
            BaudRate::B56700 => 56700,
        }
    }

    /// Digit selecting this rate in the `SB` command.
    pub fn code(self) -> char {
        match self {
            BaudRate::B56700 => '1',
            BaudRate::B38400 => '2',
            BaudRate::B28800 => '3',
            BaudRate::B19200 => '4',
            BaudRate::B14400 => '5',
            BaudRate::B9600 => '6',
            BaudRate::B4800 => '7',
            BaudRate::B2400 => '8',
            BaudRate::B1200 => '9',
        }
    }

    fn from_kilobaud(token: &str) -> Option<Self> {
        BaudRate::ALL
            .iter()
            .copied()
            .find(|rate| format!("{:.1}", f64::from(rate.bits_per_second()) / 1000.0) == token)
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate::B9600
    }
}

impl Display for BaudRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.bits_per_second().fmt(f)
    }
}

impl FromStr for BaudRate {
    type Err = ProtocolError;

    /// Accepts exact bps (`9600`) or the handbox's kilobaud form (`9.6`,
    /// `9.6k`, `56.7K`).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let token = input.trim();
        let rate = match token.strip_suffix(&['k', 'K'][..]) {
            Some(kilobaud) => BaudRate::from_kilobaud(kilobaud),
            None => BaudRate::from_kilobaud(token).or_else(|| {
                token.parse::<u32>().ok().and_then(|bps| {
                    BaudRate::ALL
                        .iter()
                        .copied()
                        .find(|rate| rate.bits_per_second() == bps)
                })
            }),
        };
        rate.ok_or_else(|| ProtocolError::UnsupportedArgument(format!("baud rate '{}'", input)))
    }
}

#[derive(Debug, Clone)]
pub struct PortConfig {
    pub port_name: String,
    pub baud_rate: BaudRate,
    pub timeout: Duration,
    pub write_timeout: Duration,
    pub simulate: bool,
    /// Canned bytes served by the simulator, starting with the handshake reply.
    pub simulated_reply: Vec<u8>,
    /// Skip the busy-port check.
    pub force: bool,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: BaudRate::default(),
            timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            simulate: false,
            simulated_reply: b"P".to_vec(),
            force: false,
        }
    }
}

/// Opens the channel `config` describes: a serial device, or the simulator
/// when `config.simulate` is set.
pub fn open_channel(config: &PortConfig) -> Result<Box<dyn Channel>, ProtocolError> {
    if config.write_timeout >= config.timeout {
        return Err(ProtocolError::UnsupportedArgument(format!(
            "write timeout {:?} must be shorter than read timeout {:?}",
            config.write_timeout, config.timeout
        )));
    }

    if config.simulate {
        debug!("open_channel: simulating {}", &config.port_name);
        return Ok(Box::new(SimulatedPort::new(
            &config.port_name,
            &config.simulated_reply,
        )));
    }

    Ok(Box::new(SerialChannel::open(config)?))
}

pub struct SerialChannel {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl SerialChannel {
    pub fn open(config: &PortConfig) -> Result<Self, ProtocolError> {
        let port_name = config.port_name.clone();

        if !config.force && is_port_open(&port_name) {
            return Err(ProtocolError::Connection {
                port_name,
                reason: "busy".to_string(),
            });
        }

        let port = serialport::new(&port_name, config.baud_rate.bits_per_second())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|e| ProtocolError::Connection {
                port_name: port_name.clone(),
                reason: e.to_string(),
            })?;

        debug!("open_port OK: {} @ {} baud", &port_name, config.baud_rate);
        Ok(Self {
            name: port_name,
            port: Some(port),
            read_timeout: config.timeout,
            write_timeout: config.write_timeout,
        })
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port closed"))
    }
}

impl Channel for SerialChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let (read_timeout, write_timeout) = (self.read_timeout, self.write_timeout);
        let port = self.port()?;

        port.set_timeout(write_timeout)?;
        let written = port.write_all(bytes).and_then(|_| port.flush());
        port.set_timeout(read_timeout)?;
        written
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let port = self.port()?;
        let mut buffer = [0u8; 1];
        loop {
            return match port.read(&mut buffer) {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(buffer[0])),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if self.port.take().is_some() {
            debug!("close_port: {}", &self.name);
        }
        Ok(())
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(not(target_os = "linux"))]
fn is_port_open(_port_name: &str) -> bool {
    false
}
