use super::{CommandError, Result};
use crate::protocol::{AlignmentMode, ProtocolClient};

/// Periodic error correction training and playback (LX200GPS).
///
/// Only meaningful on a polar-aligned mount; [`Pec::new`] checks the mode
/// found at connect time.
pub struct Pec<'a> {
    client: &'a mut ProtocolClient,
}

impl<'a> Pec<'a> {
    pub fn new(client: &'a mut ProtocolClient) -> Result<Self> {
        match client.alignment() {
            Some(AlignmentMode::Polar) => Ok(Self { client }),
            alignment => Err(CommandError::NotPolar { alignment }),
        }
    }

    /// Toggles PEC playback on both axes.
    pub fn toggle(&mut self) -> Result<()> {
        Ok(self.client.send_only("$Q", &[])?)
    }

    pub fn set_ra(&mut self, enabled: bool) -> Result<()> {
        Ok(self.client.send_only("$QZ", &[sign(enabled)])?)
    }

    pub fn set_dec(&mut self, enabled: bool) -> Result<()> {
        Ok(self.client.send_only("$QA", &[sign(enabled)])?)
    }
}

fn sign(enabled: bool) -> &'static str {
    if enabled {
        "+"
    } else {
        "-"
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
    fn requires_polar_mount() {
        for handshake in [&b"A"[..], b"L"] {
            let port = SimulatedPort::replay("sim", handshake);
            let mut client = client_over(&port);
            let expected = client.alignment();

            match Pec::new(&mut client) {
                Err(CommandError::NotPolar { alignment }) => assert_eq!(alignment, expected),
                Err(other) => panic!("unexpected {:?}", other),
                Ok(_) => panic!("accepted a non-polar mount"),
            }
            assert_eq!(port.written(), b"\x06");
        }
    }

    #[test]
    fn axis_frames() {
        let port = SimulatedPort::replay("sim", b"P");
        let mut client = client_over(&port);
        let mut pec = Pec::new(&mut client).unwrap();

        pec.toggle().unwrap();
        pec.set_ra(true).unwrap();
        pec.set_ra(false).unwrap();
        pec.set_dec(true).unwrap();
        pec.set_dec(false).unwrap();
        assert_eq!(port.written(), b"\x06#:$Q##:$QZ+##:$QZ-##:$QA+##:$QA-#");
    }
}
