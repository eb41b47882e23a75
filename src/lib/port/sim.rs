use super::Channel;

use log::debug;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct SimState {
    input: VecDeque<u8>,
    written: Vec<u8>,
    closed: bool,
}

/// Canned-buffer stand-in for a telescope.
///
/// Reads drain a fixed buffer and then report end of stream; writes are
/// recorded and otherwise discarded. Clones share state, so a test can keep
/// one handle while the client owns another.
#[derive(Debug, Clone)]
pub struct SimulatedPort {
    name: String,
    lenient: bool,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPort {
    /// Simulation mode: the client accepts any boolean reply.
    pub fn new(name: &str, canned: &[u8]) -> Self {
        Self {
            lenient: true,
            ..Self::replay(name, canned)
        }
    }

    /// Replays canned bytes as if a device sent them; replies are decoded
    /// exactly as they would be from hardware.
    pub fn replay(name: &str, canned: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            lenient: false,
            state: Arc::new(Mutex::new(SimState {
                input: canned.iter().copied().collect(),
                ..SimState::default()
            })),
        }
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.state
            .lock()
            .map(|state| state.written.clone())
            .unwrap_or_default()
    }

    /// Canned bytes not yet read.
    pub fn remaining(&self) -> Vec<u8> {
        self.state
            .lock()
            .map(|state| state.input.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().map(|state| state.closed).unwrap_or(true)
    }

    /// Appends bytes to the canned buffer.
    pub fn feed(&self, bytes: &[u8]) {
        if let Ok(mut state) = self.state.lock() {
            state.input.extend(bytes.iter().copied());
        }
    }

    fn open_state(&self) -> io::Result<MutexGuard<'_, SimState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "simulator state poisoned"))?;
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port closed"));
        }
        Ok(state)
    }
}

impl Channel for SimulatedPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.open_state()?.written.extend_from_slice(bytes);
        Ok(())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.open_state()?.input.pop_front())
    }

    fn close(&mut self) -> io::Result<()> {
        if let Ok(mut state) = self.state.lock() {
            if !state.closed {
                debug!("close_port: {} (simulated)", &self.name);
                state.closed = true;
            }
        }
        Ok(())
    }

    fn is_simulated(&self) -> bool {
        self.lenient
    }
}
