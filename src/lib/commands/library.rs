use super::{check_range, confirm, query, Result};
use crate::protocol::ProtocolClient;

/// Object library: selects catalog entries as the current target.
pub struct Library<'a> {
    client: &'a mut ProtocolClient,
    retries: usize,
}

impl<'a> Library<'a> {
    pub fn new(client: &'a mut ProtocolClient, retries: usize) -> Self {
        Self { client, retries }
    }

    pub fn select_messier(&mut self, number: u32) -> Result<()> {
        self.select("LM", "messier object", number, 1..=110)
    }

    pub fn select_ngc(&mut self, number: u32) -> Result<()> {
        self.select("LC", "NGC object", number, 1..=7840)
    }

    pub fn select_star(&mut self, number: u32) -> Result<()> {
        self.select("LS", "star", number, 1..=9999)
    }

    /// Handbox description of the current object.
    pub fn object_info(&mut self) -> Result<String> {
        Ok(query(self.client, self.retries, "LI", &[])?)
    }

    pub fn find_next(&mut self) -> Result<()> {
        Ok(self.client.send_only("LN", &[])?)
    }

    pub fn find_previous(&mut self) -> Result<()> {
        Ok(self.client.send_only("LB", &[])?)
    }

    /// Finds an object matching the current search constraints.
    pub fn find_object(&mut self) -> Result<()> {
        Ok(self.client.send_only("LF", &[])?)
    }

    /// Deep sky catalog for `LC`: 0 NGC, 1 IC, 2 UGC, 3 Caldwell, 4 Arp,
    /// 5 Abell. `false` when the handbox lacks the catalog.
    pub fn select_deep_sky_catalog(&mut self, catalog: u32) -> Result<bool> {
        let catalog = check_range("catalog", catalog, 0..=5)?.to_string();
        Ok(confirm(self.client, self.retries, "Lo", &[&catalog])?)
    }

    fn select(
        &mut self,
        mnemonic: &str,
        what: &str,
        number: u32,
        range: std::ops::RangeInclusive<u32>,
    ) -> Result<()> {
        let number = format!("{:04}", check_range(what, number, range)?);
        Ok(self.client.send_only(mnemonic, &[&number])?)
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
    fn selects_zero_padded() {
        let port = SimulatedPort::replay("sim", b"P");
        let mut client = client_over(&port);
        let mut library = Library::new(&mut client, 0);

        library.select_ngc(101).unwrap();
        library.select_messier(31).unwrap();
        library.select_star(9999).unwrap();
        assert_eq!(port.written(), b"\x06#:LC0101##:LM0031##:LS9999#");
    }

    #[test]
    fn rejects_unknown_objects() {
        let port = SimulatedPort::replay("sim", b"P");
        let mut client = client_over(&port);
        let mut library = Library::new(&mut client, 0);

        for result in [
            library.select_messier(0),
            library.select_messier(111),
            library.select_ngc(7841),
            library.select_star(10000),
        ] {
            assert!(matches!(
                result,
                Err(CommandError::Protocol(ProtocolError::UnsupportedArgument(_)))
            ));
        }
        assert_eq!(port.written(), b"\x06");
    }

    #[test]
    fn browse_and_describe() {
        let port = SimulatedPort::replay("sim", b"PM31 EX GAL MAG 3.5 SZ178.0'#");
        let mut client = client_over(&port);
        let mut library = Library::new(&mut client, 0);

        library.find_next().unwrap();
        library.find_previous().unwrap();
        assert_eq!(library.object_info().unwrap(), "M31 EX GAL MAG 3.5 SZ178.0'");
        assert_eq!(port.written(), b"\x06#:LN##:LB##:LI#");
    }

    #[test]
    fn catalog_selection() {
        let port = SimulatedPort::replay("sim", b"P10");
        let mut client = client_over(&port);
        let mut library = Library::new(&mut client, 0);

        assert!(library.select_deep_sky_catalog(1).unwrap());
        assert!(!library.select_deep_sky_catalog(4).unwrap());
        assert!(library.select_deep_sky_catalog(6).is_err());
        assert_eq!(port.written(), b"\x06#:Lo1##:Lo4#");
    }
}
