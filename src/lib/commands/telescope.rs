use super::{check_range, confirm, parse_reply, query, retrying, CommandError, Result};
use crate::coords::{
    format_angle_long, format_angle_short, format_longitude, format_right_ascension,
    format_right_ascension_long, parse_right_ascension, parse_sexagesimal,
};
use crate::port::BaudRate;
use crate::protocol::{AlignmentMode, ProtocolClient, ProtocolError};
use std::str::FromStr;

/// Coordinate format the handbox is set to (toggled with `U`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// `HH:MM.T` and `sDD°MM`
    Low,
    /// `HH:MM:SS` and `sDD°MM:SS`
    High,
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    fn code(self) -> &'static str {
        match self {
            Direction::North => "n",
            Direction::South => "s",
            Direction::East => "e",
            Direction::West => "w",
        }
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "n" | "north" => Ok(Direction::North),
            "s" | "south" => Ok(Direction::South),
            "e" | "east" => Ok(Direction::East),
            "w" | "west" => Ok(Direction::West),
            _ => Err(ProtocolError::UnsupportedArgument(format!(
                "direction '{}'",
                input
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlewRate {
    Centering,
    Guide,
    Find,
    Max,
}

impl SlewRate {
    fn mnemonic(self) -> &'static str {
        match self {
            SlewRate::Centering => "RC",
            SlewRate::Guide => "RG",
            SlewRate::Find => "RM",
            SlewRate::Max => "RS",
        }
    }
}

impl FromStr for SlewRate {
    type Err = ProtocolError;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "centering" | "center" => Ok(SlewRate::Centering),
            "guide" => Ok(SlewRate::Guide),
            "find" => Ok(SlewRate::Find),
            "max" => Ok(SlewRate::Max),
            _ => Err(ProtocolError::UnsupportedArgument(format!(
                "slew rate '{}'",
                input
            ))),
        }
    }
}

/// Progress of a home search started with [`Telescope::find_home`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeStatus {
    Failed,
    Found,
    Searching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slew {
    Started,
    BelowHorizon(String),
    AboveLimit(String),
}

/// Mount position, targets, motion, site and handbox information.
pub struct Telescope<'a> {
    client: &'a mut ProtocolClient,
    retries: usize,
    precision: Precision,
}

impl<'a> Telescope<'a> {
    pub fn new(client: &'a mut ProtocolClient, retries: usize) -> Self {
        Self {
            client,
            retries,
            precision: Precision::default(),
        }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Right ascension in degrees.
    pub fn get_ra(&mut self) -> Result<f64> {
        let reply = query(self.client, self.retries, "GR", &[])?;
        parse_reply("GR", reply, parse_right_ascension)
    }

    /// Declination in degrees.
    pub fn get_dec(&mut self) -> Result<f64> {
        let reply = query(self.client, self.retries, "GD", &[])?;
        parse_reply("GD", reply, parse_sexagesimal)
    }

    pub fn get_altitude(&mut self) -> Result<f64> {
        let reply = query(self.client, self.retries, "GA", &[])?;
        parse_reply("GA", reply, parse_sexagesimal)
    }

    pub fn get_azimuth(&mut self) -> Result<f64> {
        let reply = query(self.client, self.retries, "GZ", &[])?;
        parse_reply("GZ", reply, parse_sexagesimal)
    }

    pub fn set_target_ra(&mut self, angle: f64) -> Result<bool> {
        let text = match self.precision {
            Precision::Low => format_right_ascension(angle),
            Precision::High => format_right_ascension_long(angle),
        };
        Ok(confirm(self.client, self.retries, "Sr", &[&text])?)
    }

    pub fn set_target_dec(&mut self, angle: f64) -> Result<bool> {
        let text = self.format_angle(angle);
        Ok(confirm(self.client, self.retries, "Sd", &[&text])?)
    }

    pub fn set_target_altitude(&mut self, angle: f64) -> Result<bool> {
        Ok(confirm(self.client, self.retries, "Sa", &[&format_angle_short(angle)])?)
    }

    pub fn set_target_azimuth(&mut self, angle: f64) -> Result<bool> {
        Ok(confirm(self.client, self.retries, "Sz", &[&format_longitude(angle)])?)
    }

    /// Slews to the current target.
    pub fn slew_to_target(&mut self) -> Result<Slew> {
        let reply = retrying(self.retries, "MS", || {
            self.client.send_for_status("MS", &[], b'0')
        })?;
        let message = reply.message.unwrap_or_default();
        Ok(match reply.code {
            b'0' => Slew::Started,
            b'1' => Slew::BelowHorizon(message),
            _ => Slew::AboveLimit(message),
        })
    }

    pub fn abort_slew(&mut self) -> Result<()> {
        Ok(self.client.send_only("Q", &[])?)
    }

    /// Syncs the mount to the current target; returns the handbox message.
    pub fn sync(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "CM", &[])?)
    }

    pub fn start_move(&mut self, direction: Direction) -> Result<()> {
        Ok(self.client.send_only("M", &[direction.code()])?)
    }

    pub fn stop_move(&mut self, direction: Direction) -> Result<()> {
        Ok(self.client.send_only("Q", &[direction.code()])?)
    }

    pub fn set_slew_rate(&mut self, rate: SlewRate) -> Result<()> {
        Ok(self.client.send_only(rate.mnemonic(), &[])?)
    }

    pub fn toggle_precision(&mut self) -> Result<()> {
        self.client.send_only("U", &[])?;
        self.precision = match self.precision {
            Precision::Low => Precision::High,
            Precision::High => Precision::Low,
        };
        Ok(())
    }

    pub fn get_site_latitude(&mut self) -> Result<f64> {
        let reply = query(self.client, self.retries, "Gt", &[])?;
        parse_reply("Gt", reply, parse_sexagesimal)
    }

    pub fn set_site_latitude(&mut self, angle: f64) -> Result<bool> {
        Ok(confirm(self.client, self.retries, "St", &[&format_angle_short(angle)])?)
    }

    /// Longitude in the firmware's convention, degrees west of Greenwich.
    pub fn get_site_longitude(&mut self) -> Result<f64> {
        let reply = query(self.client, self.retries, "Gg", &[])?;
        parse_reply("Gg", reply, parse_sexagesimal)
    }

    pub fn set_site_longitude(&mut self, angle: f64) -> Result<bool> {
        Ok(confirm(self.client, self.retries, "Sg", &[&format_longitude(angle)])?)
    }

    pub fn local_time(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "GL", &[])?)
    }

    pub fn sidereal_time(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "GS", &[])?)
    }

    pub fn product_name(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "GVP", &[])?)
    }

    pub fn firmware_version(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "GVN", &[])?)
    }

    pub fn firmware_date(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "GVD", &[])?)
    }

    pub fn firmware_time(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "GVT", &[])?)
    }

    /// Handbox date, `MM/DD/YY`.
    pub fn get_date(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "GC", &[])?)
    }

    pub fn set_local_time(&mut self, hour: u32, minute: u32, second: u32) -> Result<bool> {
        let time = format!(
            "{:02}:{:02}:{:02}",
            check_range("hour", hour, 0..=23)?,
            check_range("minute", minute, 0..=59)?,
            check_range("second", second, 0..=59)?
        );
        Ok(confirm(self.client, self.retries, "SL", &[&time])?)
    }

    /// Sets the handbox date (UTC on the LX200GPS). `false` if the firmware
    /// rejected it; an accepted date is followed by an "Updating planetary
    /// data" message, which is consumed.
    pub fn change_date(&mut self, month: u32, day: u32, year: u32) -> Result<bool> {
        let date = format!(
            "{:02}/{:02}/{:02}",
            check_range("month", month, 1..=12)?,
            check_range("day", day, 1..=31)?,
            year % 100
        );
        let reply = retrying(self.retries, "SC", || {
            self.client.send_for_status("SC", &[&date], b'0')
        })?;
        Ok(reply.code == b'1')
    }

    /// Hours added to local time to give UTC.
    pub fn get_utc_offset(&mut self) -> Result<f64> {
        let reply = query(self.client, self.retries, "GG", &[])?;
        parse_reply("GG", reply, parse_sexagesimal)
    }

    pub fn set_utc_offset(&mut self, hours: f64) -> Result<bool> {
        if !(-24.0..=24.0).contains(&hours) {
            return Err(ProtocolError::UnsupportedArgument(format!("UTC offset {}", hours)).into());
        }
        let offset = format!("{:+05.1}", hours);
        Ok(confirm(self.client, self.retries, "SG", &[&offset])?)
    }

    /// LX200GPS and 16": seeks home and stores the encoder values there.
    pub fn store_home(&mut self) -> Result<()> {
        Ok(self.client.send_only("hS", &[])?)
    }

    /// Seeks home and aligns from the stored encoder values.
    pub fn align_home(&mut self) -> Result<()> {
        Ok(self.client.send_only("hF", &[])?)
    }

    /// Starts a slew to the park position; poll [`home_status`](Self::home_status).
    pub fn find_home(&mut self) -> Result<()> {
        Ok(self.client.send_only("hP", &[])?)
    }

    pub fn home_status(&mut self) -> Result<HomeStatus> {
        let reply = query(self.client, self.retries, "h?", &[])?;
        match reply.trim() {
            "0" => Ok(HomeStatus::Failed),
            "1" => Ok(HomeStatus::Found),
            "2" => Ok(HomeStatus::Searching),
            _ => Err(CommandError::UnexpectedReply {
                mnemonic: "h?",
                reply,
            }),
        }
    }

    /// Asks the handbox to switch rates. It answers at the old rate; the
    /// port has to be reopened at `rate` afterwards.
    pub fn set_baud_rate(&mut self, rate: BaudRate) -> Result<bool> {
        let code = rate.code().to_string();
        Ok(confirm(self.client, self.retries, "SB", &[&code])?)
    }

    pub fn alignment(&mut self) -> Result<Option<AlignmentMode>> {
        Ok(self.client.query_alignment()?)
    }

    pub fn set_alignment_mode(&mut self, mode: AlignmentMode) -> Result<()> {
        Ok(self.client.set_alignment_mode(mode)?)
    }

    fn format_angle(&self, angle: f64) -> String {
        match self.precision {
            Precision::Low => format_angle_short(angle),
            Precision::High => format_angle_long(angle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::SimulatedPort;

    fn client_over(port: &SimulatedPort) -> ProtocolClient {
        let mut client = ProtocolClient::new();
        client.connect_channel(Box::new(port.clone())).unwrap();
        client
    }

    #[test]
    fn position_queries() {
        let port = SimulatedPort::replay("sim", b"P12:34.5#-27\xdf55:54#");
        let mut client = client_over(&port);
        let mut scope = Telescope::new(&mut client, 0);

        assert!((scope.get_ra().unwrap() - 188.625).abs() < 1e-9);
        assert!((scope.get_dec().unwrap() + 27.931666).abs() < 1e-6);
        assert_eq!(port.written(), b"\x06#:GR##:GD#");
    }

    #[test]
    fn unreadable_position() {
        let port = SimulatedPort::replay("sim", b"P??#");
        let mut client = client_over(&port);
        let mut scope = Telescope::new(&mut client, 0);

        match scope.get_dec() {
            Err(CommandError::BadReply { mnemonic, reply, .. }) => {
                assert_eq!(mnemonic, "GD");
                assert_eq!(reply, "??");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn target_follows_precision() {
        let port = SimulatedPort::replay("sim", b"P1111");
        let mut client = client_over(&port);

        let mut scope = Telescope::new(&mut client, 0);
        assert!(scope.set_target_ra(188.625).unwrap());
        assert!(scope.set_target_dec(-27.9319).unwrap());

        let mut scope = Telescope::new(&mut client, 0).with_precision(Precision::High);
        assert!(scope.set_target_ra(188.625).unwrap());
        assert!(scope.set_target_dec(-27.9319).unwrap());

        let mut expected = b"\x06#:Sr12:34.5##:Sd-27\xdf56#".to_vec();
        expected.extend_from_slice(b"#:Sr12:34:30##:Sd-27\xdf55:55#");
        assert_eq!(port.written(), expected);
    }

    #[test]
    fn slew_outcomes() {
        let port = SimulatedPort::replay("sim", b"P01Below Horizon#2Above Limit#");
        let mut client = client_over(&port);
        let mut scope = Telescope::new(&mut client, 0);

        assert_eq!(scope.slew_to_target().unwrap(), Slew::Started);
        assert_eq!(
            scope.slew_to_target().unwrap(),
            Slew::BelowHorizon("Below Horizon".to_string())
        );
        assert_eq!(
            scope.slew_to_target().unwrap(),
            Slew::AboveLimit("Above Limit".to_string())
        );
    }

    #[test]
    fn motion_commands() {
        let port = SimulatedPort::replay("sim", b"P");
        let mut client = client_over(&port);
        let mut scope = Telescope::new(&mut client, 0);

        scope.set_slew_rate(SlewRate::Find).unwrap();
        scope.start_move(Direction::North).unwrap();
        scope.stop_move(Direction::North).unwrap();
        scope.abort_slew().unwrap();
        assert_eq!(port.written(), b"\x06#:RM##:Mn##:Qn##:Q#");
    }

    #[test]
    fn parse_motion_arguments() {
        assert_eq!("W".parse::<Direction>().unwrap(), Direction::West);
        assert_eq!("north".parse::<Direction>().unwrap(), Direction::North);
        assert!("up".parse::<Direction>().is_err());
        assert_eq!("guide".parse::<SlewRate>().unwrap(), SlewRate::Guide);
        assert!("warp".parse::<SlewRate>().is_err());
    }

    #[test]
    fn site_and_baud() {
        let port = SimulatedPort::replay("sim", b"P111");
        let mut client = client_over(&port);
        let mut scope = Telescope::new(&mut client, 0);

        assert!(scope.set_site_latitude(45.5).unwrap());
        assert!(scope.set_site_longitude(117.2553).unwrap());
        assert!(scope.set_baud_rate(BaudRate::B19200).unwrap());
        assert_eq!(
            port.written(),
            b"\x06#:St+45\xdf30##:Sg117\xdf15##:SB4#".to_vec()
        );
    }

    #[test]
    fn clock_and_calendar() {
        let port = SimulatedPort::replay(
            "sim",
            b"P111Updating Planetary Data#0-05.0#03/14/24#",
        );
        let mut client = client_over(&port);
        let mut scope = Telescope::new(&mut client, 0);

        assert!(scope.set_local_time(21, 5, 9).unwrap());
        assert!(scope.set_utc_offset(-5.0).unwrap());
        assert!(scope.change_date(3, 14, 2024).unwrap());
        assert!(!scope.change_date(2, 31, 24).unwrap());
        assert!((scope.get_utc_offset().unwrap() + 5.0).abs() < 1e-9);
        assert_eq!(scope.get_date().unwrap(), "03/14/24");

        let mut expected = b"\x06#:SL21:05:09##:SG-05.0##:SC03/14/24##:SC02/31/24#".to_vec();
        expected.extend_from_slice(b"#:GG##:GC#");
        assert_eq!(port.written(), expected);
    }

    #[test]
    fn clock_arguments_checked_before_sending() {
        let port = SimulatedPort::replay("sim", b"P");
        let mut client = client_over(&port);
        let mut scope = Telescope::new(&mut client, 0);

        assert!(scope.set_local_time(24, 0, 0).is_err());
        assert!(scope.set_local_time(12, 60, 0).is_err());
        assert!(scope.change_date(13, 1, 24).is_err());
        assert!(scope.set_utc_offset(25.0).is_err());
        assert!(scope.set_utc_offset(f64::NAN).is_err());
        assert_eq!(port.written(), b"\x06");
    }

    #[test]
    fn home_position() {
        let port = SimulatedPort::replay("sim", b"P2#1#0#7#");
        let mut client = client_over(&port);
        let mut scope = Telescope::new(&mut client, 0);

        scope.store_home().unwrap();
        scope.align_home().unwrap();
        scope.find_home().unwrap();
        assert_eq!(scope.home_status().unwrap(), HomeStatus::Searching);
        assert_eq!(scope.home_status().unwrap(), HomeStatus::Found);
        assert_eq!(scope.home_status().unwrap(), HomeStatus::Failed);
        assert!(matches!(
            scope.home_status(),
            Err(CommandError::UnexpectedReply { mnemonic: "h?", .. })
        ));
        assert_eq!(port.written().len(), b"\x06#:hS##:hF##:hP#".len() + 4 * 5);
    }

    #[test]
    fn firmware_info() {
        let port = SimulatedPort::replay("sim", b"PLX2001#4.2g#Oct 05 2007#14:22:31#");
        let mut client = client_over(&port);
        let mut scope = Telescope::new(&mut client, 0);

        assert_eq!(scope.product_name().unwrap(), "LX2001");
        assert_eq!(scope.firmware_version().unwrap(), "4.2g");
        assert_eq!(scope.firmware_date().unwrap(), "Oct 05 2007");
        assert_eq!(scope.firmware_time().unwrap(), "14:22:31");
        assert_eq!(port.written(), b"\x06#:GVP##:GVN##:GVD##:GVT#");
    }

    #[test]
    fn alignment_goes_through_client() {
        let port = SimulatedPort::replay("sim", b"PA");
        let mut client = client_over(&port);

        {
            let mut scope = Telescope::new(&mut client, 0);
            assert_eq!(scope.alignment().unwrap(), Some(AlignmentMode::AltAz));
            scope.set_alignment_mode(AlignmentMode::Polar).unwrap();
        }
        assert_eq!(client.alignment(), Some(AlignmentMode::Polar));
    }
}
