use super::{confirm, query, Result};
use crate::protocol::ProtocolClient;

/// LX200GPS receiver and power management.
pub struct Gps<'a> {
    client: &'a mut ProtocolClient,
    retries: usize,
}

impl<'a> Gps<'a> {
    pub fn new(client: &'a mut ProtocolClient, retries: usize) -> Self {
        Self { client, retries }
    }

    pub fn power_on(&mut self) -> Result<()> {
        Ok(self.client.send_only("g+", &[])?)
    }

    pub fn power_off(&mut self) -> Result<()> {
        Ok(self.client.send_only("g-", &[])?)
    }

    /// Sets the handbox clock from GPS. This can take minutes; the read
    /// timeout must allow for it. `false` if the fix timed out or the user
    /// interrupted it.
    pub fn update_time(&mut self) -> Result<bool> {
        Ok(confirm(self.client, self.retries, "gT", &[])?)
    }

    /// Next NMEA sentence from the receiver.
    pub fn nmea_sentence(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "gps", &[])?)
    }

    /// Powers down motors and displays until a key press or [`wake`](Self::wake).
    pub fn sleep(&mut self) -> Result<()> {
        Ok(self.client.send_only("hN", &[])?)
    }

    pub fn wake(&mut self) -> Result<()> {
        Ok(self.client.send_only("hW", &[])?)
    }

    /// Reboots the handbox as if power-cycled. The port must be reconnected
    /// once it is back.
    pub fn restart(&mut self) -> Result<()> {
        Ok(self.client.send_only("I", &[])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::SimulatedPort;
    use crate::protocol::NAK;

    fn client_over(port: &SimulatedPort) -> ProtocolClient {
        let mut client = ProtocolClient::new();
        client.connect_channel(Box::new(port.clone())).unwrap();
        client
    }

    #[test]
    fn power_frames() {
        let port = SimulatedPort::replay("sim", b"A");
        let mut client = client_over(&port);
        let mut gps = Gps::new(&mut client, 0);

        gps.power_on().unwrap();
        gps.sleep().unwrap();
        gps.wake().unwrap();
        gps.power_off().unwrap();
        gps.restart().unwrap();
        assert_eq!(port.written(), b"\x06#:g+##:hN##:hW##:g-##:I#");
    }

    #[test]
    fn update_time_waits_out_busy() {
        let port = SimulatedPort::replay("sim", &[b'A', NAK, b'1', b'0']);
        let mut client = client_over(&port);
        let mut gps = Gps::new(&mut client, 1);

        assert!(gps.update_time().unwrap());
        assert!(!gps.update_time().unwrap());
        assert_eq!(port.written(), b"\x06#:gT##:gT##:gT#");
    }

    #[test]
    fn nmea_sentence() {
        let port = SimulatedPort::replay("sim", b"A$GPGGA,123519,4807.038,N#");
        let mut client = client_over(&port);
        let mut gps = Gps::new(&mut client, 0);

        assert_eq!(gps.nmea_sentence().unwrap(), "$GPGGA,123519,4807.038,N");
    }
}
