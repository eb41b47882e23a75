use clap::{ArgEnum, Parser, Subcommand};
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;
use thiserror::Error;

use lx200::commands::{Direction, SlewRate};
use lx200::coords::{parse_right_ascension, parse_sexagesimal, CoordError};
use lx200::port::BaudRate;
use lx200::protocol::AlignmentMode;

/// Angle in degrees, given as `sDD:MM:SS`, `sDD*MM` or plain decimal.
#[derive(Debug, Clone, Copy)]
pub struct Angle(pub f64);

impl FromStr for Angle {
    type Err = CoordError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse_sexagesimal(input).map(Angle)
    }
}

/// Right ascension given in hours (`HH:MM:SS`, `HH:MM.T`), held in degrees.
#[derive(Debug, Clone, Copy)]
pub struct Hours(pub f64);

impl FromStr for Hours {
    type Err = CoordError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse_right_ascension(input).map(Hours)
    }
}

#[derive(Error, Debug)]
pub enum FieldsError {
    #[error("Bad time '{0}', expected HH:MM:SS")]
    BadTime(String),
    #[error("Bad date '{0}', expected MM/DD/YY")]
    BadDate(String),
}

fn fields(re: &Regex, input: &str) -> Option<[u32; 3]> {
    let c = re.captures(input)?;
    let mut values = [0; 3];
    for (i, value) in values.iter_mut().enumerate() {
        *value = c.get(i + 1)?.as_str().parse().ok()?;
    }
    Some(values)
}

/// Local time of day, `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl FromStr for ClockTime {
    type Err = FieldsError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})$").unwrap();
        }

        let [hour, minute, second] =
            fields(&RE, input).ok_or_else(|| FieldsError::BadTime(input.to_string()))?;
        Ok(ClockTime {
            hour,
            minute,
            second,
        })
    }
}

/// Calendar date, `MM/DD/YY` or `MM/DD/YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    pub month: u32,
    pub day: u32,
    pub year: u32,
}

impl FromStr for CalendarDate {
    type Err = FieldsError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})$").unwrap();
        }

        let [month, day, year] =
            fields(&RE, input).ok_or_else(|| FieldsError::BadDate(input.to_string()))?;
        Ok(CalendarDate { month, day, year })
    }
}

#[derive(ArgEnum, Clone, Copy, Debug)]
pub enum HomeAction {
    Store,
    Align,
    Park,
    Status,
}

#[derive(ArgEnum, Clone, Copy, Debug)]
pub enum PecAction {
    Toggle,
    RaOn,
    RaOff,
    DecOn,
    DecOff,
}

#[derive(ArgEnum, Clone, Copy, Debug)]
pub enum ReplyKind {
    None,
    Bool,
    String,
    Status,
}

#[derive(ArgEnum, Clone, Copy, Debug)]
pub enum FocusAction {
    In,
    Out,
    Stop,
    Fast,
    Slow,
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Skip the busy port check
    #[clap(long, short)]
    pub force: bool,

    /// enable debug output
    #[clap(long, short)]
    pub debug: bool,

    /// Serial device
    #[clap(long, short, default_value = "/dev/ttyUSB0")]
    pub port: String,

    /// Baud rate, in bps or kilobaud (9.6k)
    #[clap(long, short, default_value = "9600")]
    pub baudrate: BaudRate,

    /// Read timeout, seconds
    #[clap(long, short, default_value_t = 10)]
    pub timeout: u64,

    /// Write timeout, seconds; must be below the read timeout
    #[clap(long, short, default_value_t = 3)]
    pub write_timeout: u64,

    /// Talk to a simulated telescope instead of the serial device
    #[clap(long, short)]
    pub simulate: bool,

    /// Bytes the simulator serves, starting with the handshake reply
    #[clap(long, default_value = "P")]
    pub sim_reply: String,

    /// Retry count for busy or truncated replies
    #[clap(long, short, default_value_t = 0)]
    pub retries: usize,

    /// Use json-formatted output
    #[clap(long, short)]
    pub json: bool,

    /// Send coordinates in high precision format
    #[clap(long, short = 'H')]
    pub high_precision: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query the alignment mode
    Alignment,

    /// Set the alignment mode (altaz, land, polar)
    SetAlignment { mode: AlignmentMode },

    /// Read right ascension and declination
    #[clap(visible_alias = "pos")]
    Position,

    /// Read altitude and azimuth
    Altaz,

    /// Slew to a target
    Goto {
        /// Right ascension, hours
        ra: Hours,
        /// Declination, degrees
        #[clap(allow_hyphen_values = true)]
        dec: Angle,
    },

    /// Stop all slewing
    Abort,

    /// Sync the mount to the current target
    Sync,

    /// Start moving towards a direction (n, s, e, w)
    Move {
        direction: Direction,
        /// Slew rate (centering, guide, find, max)
        #[clap(long)]
        rate: Option<SlewRate>,
    },

    /// Stop moving towards a direction
    Stop { direction: Direction },

    /// Show product, firmware version, date and time
    Info,

    /// Show, or set, the handbox clock and calendar
    Time {
        /// Set local time, HH:MM:SS
        #[clap(long)]
        local: Option<ClockTime>,
        /// Set the date, MM/DD/YY
        #[clap(long)]
        date: Option<CalendarDate>,
        /// Set hours added to local time to give UTC
        #[clap(long, allow_hyphen_values = true)]
        utc_offset: Option<f64>,
    },

    /// Home position: store, align, park or status
    Home {
        #[clap(arg_enum)]
        action: HomeAction,
    },

    /// Periodic error correction, polar mounts only
    Pec {
        #[clap(arg_enum)]
        action: PecAction,
    },

    /// Reboot the handbox
    Restart,

    /// Read or set the site location
    Site {
        #[clap(allow_hyphen_values = true, requires = "longitude")]
        latitude: Option<Angle>,
        #[clap(allow_hyphen_values = true)]
        longitude: Option<Angle>,
    },

    /// Drive the focuser
    Focus {
        #[clap(arg_enum)]
        action: FocusAction,
    },

    /// Select a Messier object as target
    Messier { number: u32 },

    /// Select an NGC object as target
    Ngc { number: u32 },

    /// Describe the current library object
    Object,

    /// Set the handbox clock from GPS
    GpsTime,

    /// Switch the handbox baud rate
    SetBaud { rate: BaudRate },

    /// Send an arbitrary command
    Raw {
        mnemonic: String,
        args: Vec<String>,
        /// Expected reply
        #[clap(long, arg_enum, default_value = "none")]
        reply: ReplyKind,
    },
}
