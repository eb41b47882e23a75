use super::{check_range, Result};
use crate::protocol::ProtocolClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusSpeed {
    Slow,
    Fast,
}

/// Focuser port. Every command is fire-and-forget.
pub struct Focuser<'a> {
    client: &'a mut ProtocolClient,
}

impl<'a> Focuser<'a> {
    pub fn new(client: &'a mut ProtocolClient) -> Self {
        Self { client }
    }

    /// Starts moving toward the objective.
    pub fn focus_in(&mut self) -> Result<()> {
        Ok(self.client.send_only("F+", &[])?)
    }

    pub fn focus_out(&mut self) -> Result<()> {
        Ok(self.client.send_only("F-", &[])?)
    }

    pub fn stop(&mut self) -> Result<()> {
        Ok(self.client.send_only("FQ", &[])?)
    }

    pub fn set_speed(&mut self, speed: FocusSpeed) -> Result<()> {
        let mnemonic = match speed {
            FocusSpeed::Slow => "FS",
            FocusSpeed::Fast => "FF",
        };
        Ok(self.client.send_only(mnemonic, &[])?)
    }

    /// Autostar and LX200GPS only: speed step 1 (slowest) to 4.
    pub fn set_speed_step(&mut self, step: u32) -> Result<()> {
        let step = check_range("focus speed", step, 1..=4)?.to_string();
        Ok(self.client.send_only("F", &[&step])?)
    }
}

/// Illuminated reticule control.
pub struct Reticule<'a> {
    client: &'a mut ProtocolClient,
}

impl<'a> Reticule<'a> {
    pub fn new(client: &'a mut ProtocolClient) -> Self {
        Self { client }
    }

    pub fn brighter(&mut self) -> Result<()> {
        Ok(self.client.send_only("B+", &[])?)
    }

    pub fn darker(&mut self) -> Result<()> {
        Ok(self.client.send_only("B-", &[])?)
    }

    /// 0 is steady; classic LX200 firmware only takes 0..=3.
    pub fn set_flash_rate(&mut self, rate: u32) -> Result<()> {
        let rate = check_range("flash rate", rate, 0..=9)?.to_string();
        Ok(self.client.send_only("B", &[&rate])?)
    }

    /// LX200GPS only. 0 is always on.
    pub fn set_duty_cycle(&mut self, duty: u32) -> Result<()> {
        let duty = check_range("duty cycle", duty, 0..=15)?.to_string();
        Ok(self.client.send_only("BD", &[&duty])?)
    }
}

pub struct Derotator<'a> {
    client: &'a mut ProtocolClient,
}

impl<'a> Derotator<'a> {
    pub fn new(client: &'a mut ProtocolClient) -> Self {
        Self { client }
    }

    pub fn on(&mut self) -> Result<()> {
        Ok(self.client.send_only("r+", &[])?)
    }

    /// Also halts a slew in progress.
    pub fn off(&mut self) -> Result<()> {
        Ok(self.client.send_only("r-", &[])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandError;
    use crate::port::SimulatedPort;
    use crate::protocol::ProtocolError;

    fn client_over(port: &SimulatedPort) -> ProtocolClient {
        let mut client = ProtocolClient::new();
        client.connect_channel(Box::new(port.clone())).unwrap();
        client
    }

    #[test]
    fn focuser_frames() {
        let port = SimulatedPort::replay("sim", b"A");
        let mut client = client_over(&port);
        let mut focuser = Focuser::new(&mut client);

        focuser.set_speed(FocusSpeed::Fast).unwrap();
        focuser.focus_in().unwrap();
        focuser.stop().unwrap();
        focuser.set_speed_step(2).unwrap();
        focuser.focus_out().unwrap();
        assert_eq!(port.written(), b"\x06#:FF##:F+##:FQ##:F2##:F-#");
    }

    #[test]
    fn focuser_speed_out_of_range() {
        let port = SimulatedPort::replay("sim", b"A");
        let mut client = client_over(&port);
        let mut focuser = Focuser::new(&mut client);

        for step in [0, 5] {
            assert!(matches!(
                focuser.set_speed_step(step),
                Err(CommandError::Protocol(ProtocolError::UnsupportedArgument(_)))
            ));
        }
        assert_eq!(port.written(), b"\x06");
    }

    #[test]
    fn reticule_frames() {
        let port = SimulatedPort::replay("sim", b"A");
        let mut client = client_over(&port);
        let mut reticule = Reticule::new(&mut client);

        reticule.brighter().unwrap();
        reticule.darker().unwrap();
        reticule.set_flash_rate(3).unwrap();
        reticule.set_duty_cycle(12).unwrap();
        assert!(reticule.set_flash_rate(10).is_err());
        assert!(reticule.set_duty_cycle(16).is_err());
        assert_eq!(port.written(), b"\x06#:B+##:B-##:B3##:BD12#");
    }

    #[test]
    fn derotator_frames() {
        let port = SimulatedPort::replay("sim", b"A");
        let mut client = client_over(&port);
        let mut derotator = Derotator::new(&mut client);

        derotator.on().unwrap();
        derotator.off().unwrap();
        assert_eq!(port.written(), b"\x06#:r+##:r-#");
    }
}
