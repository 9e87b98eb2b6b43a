#![allow(dead_code)]

use solfa_bridge::error::LinkError;
use solfa_bridge::midi::{MidiMessage, NoteSink, Result as MidiResult};
use solfa_bridge::serial::{SerialLink, SerialTransport};
use solfa_bridge::LinkTimings;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, ErrorKind};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub fn fast_timings() -> LinkTimings {
    LinkTimings {
        heartbeat_timeout: Duration::from_millis(5000),
        handshake_retries: 5,
        handshake_poll: Duration::from_millis(10),
        settle: Duration::from_millis(2),
        note_hold: Duration::from_millis(30),
        frame: Duration::from_millis(1),
    }
}

/// Polls `cond` until it holds or `timeout` passes.
pub fn wait_for<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

type Inbound = Arc<Mutex<VecDeque<u8>>>;

#[derive(Default)]
struct MockState {
    listings: Mutex<VecDeque<Vec<String>>>,
    listing_failures: Mutex<usize>,
    live: Mutex<HashSet<String>>,
    unopenable: Mutex<HashSet<String>>,
    inbound: Mutex<HashMap<String, Inbound>>,
    opened: Mutex<Vec<String>>,
}

/// In-memory serial ports. Live ports answer the hello with a heartbeat.
#[derive(Clone, Default)]
pub struct MockSerial {
    state: Arc<MockState>,
}

impl MockSerial {
    /// Each `list_ports` call consumes one listing; the last one repeats.
    pub fn with_listings(listings: Vec<Vec<&str>>) -> Self {
        let mock = MockSerial::default();
        *mock.state.listings.lock().unwrap() = listings
            .into_iter()
            .map(|l| l.into_iter().map(String::from).collect())
            .collect();
        mock
    }

    pub fn live(self, port: &str) -> Self {
        self.state.live.lock().unwrap().insert(port.to_string());
        self
    }

    /// The next `count` enumerations fail before any listing is served.
    pub fn failing_listings(self, count: usize) -> Self {
        *self.state.listing_failures.lock().unwrap() = count;
        self
    }

    pub fn unopenable(self, port: &str) -> Self {
        self.state.unopenable.lock().unwrap().insert(port.to_string());
        self
    }

    pub fn plug(&self, port: &str) {
        self.state.live.lock().unwrap().insert(port.to_string());
    }

    pub fn unplug(&self, port: &str) {
        self.state.live.lock().unwrap().remove(port);
    }

    /// Queues bytes as if the device on `port` had sent them.
    pub fn inject(&self, port: &str, bytes: &[u8]) {
        self.inbound(port).lock().unwrap().extend(bytes.iter().copied());
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.opened.lock().unwrap().clone()
    }

    fn inbound(&self, port: &str) -> Inbound {
        self.state
            .inbound
            .lock()
            .unwrap()
            .entry(port.to_string())
            .or_default()
            .clone()
    }
}

impl SerialTransport for MockSerial {
    fn list_ports(&self) -> Result<Vec<String>, LinkError> {
        let mut failures = self.state.listing_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(LinkError::Enumeration("device busy".to_string()));
        }
        drop(failures);
        let mut listings = self.state.listings.lock().unwrap();
        if listings.len() > 1 {
            Ok(listings.pop_front().unwrap_or_default())
        } else {
            Ok(listings.front().cloned().unwrap_or_default())
        }
    }

    fn open(&self, port: &str, _baud_rate: u32) -> Result<Box<dyn SerialLink>, LinkError> {
        self.state.opened.lock().unwrap().push(port.to_string());
        if self.state.unopenable.lock().unwrap().contains(port) {
            return Err(LinkError::TransportOpen {
                port: port.to_string(),
                reason: "Permission denied".to_string(),
            });
        }
        Ok(Box::new(MockLink {
            port: port.to_string(),
            inbound: self.inbound(port),
            state: self.state.clone(),
        }))
    }
}

struct MockLink {
    port: String,
    inbound: Inbound,
    state: Arc<MockState>,
}

impl SerialLink for MockLink {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        if byte == b'H' && self.state.live.lock().unwrap().contains(&self.port) {
            self.inbound.lock().unwrap().push_back(b'H');
        }
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.inbound.lock().unwrap().clear();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inbound = self.inbound.lock().unwrap();
        if inbound.is_empty() {
            drop(inbound);
            thread::sleep(Duration::from_millis(1));
            return Err(io::Error::new(ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = inbound.pop_front().unwrap_or_default();
        }
        Ok(n)
    }
}

/// Records every MIDI call with the time it arrived.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(Instant, MidiMessage)>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<MidiMessage> {
        self.sent.lock().unwrap().iter().map(|(_, m)| *m).collect()
    }

    pub fn timed(&self) -> Vec<(Instant, MidiMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

impl NoteSink for RecordingSink {
    fn note_on(&self, channel: u8, note: u8, velocity: u8) -> MidiResult<()> {
        self.sent.lock().unwrap().push((
            Instant::now(),
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            },
        ));
        Ok(())
    }

    fn note_off(&self, channel: u8, note: u8, velocity: u8) -> MidiResult<()> {
        self.sent.lock().unwrap().push((
            Instant::now(),
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            },
        ));
        Ok(())
    }
}
