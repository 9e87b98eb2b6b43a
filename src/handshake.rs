//! Finding the glove: open a candidate, say hello, wait for a heartbeat.
//!
//! A port that merely opens proves nothing, so every candidate has to answer
//! the outbound `'H'` with a heartbeat inside the retry budget. Failed
//! candidates are closed and the scan moves on; the loop only ends on success
//! or when there are no ports at all.

use crate::config::LinkTimings;
use crate::decoder::{LineDecoder, LineFramer, HEARTBEAT};
use crate::error::LinkError;
use crate::scanner::PortScanner;
use crate::serial::{SerialLink, SerialTransport};
use crate::session::SharedSession;
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Owns the reader thread for an open port. Dropping it closes the port.
pub struct PortReader {
    port: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PortReader {
    /// Moves `link` onto a reader thread that frames bytes and feeds `decoder`.
    pub fn spawn(port: &str, mut link: Box<dyn SerialLink>, decoder: LineDecoder) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let name = port.to_string();

        let handle = thread::spawn(move || {
            let mut framer = LineFramer::new();
            let mut buf = [0u8; 256];
            debug!("Reader started on {}", name);
            while !stop_flag.load(Ordering::SeqCst) {
                match link.read(&mut buf) {
                    Ok(0) => continue,
                    Ok(n) => {
                        for line in framer.push(&buf[..n]) {
                            decoder.feed(&line);
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        // Removal shows up here; the heartbeat timeout handles the rest.
                        warn!("Read error on {}: {}", name, e);
                        break;
                    }
                }
            }
            let _ = link.clear();
            debug!("Reader stopped on {}", name);
        });

        Self {
            port: port.to_string(),
            stop,
            handle: Some(handle),
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PortReader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub struct HandshakeProtocol<T: SerialTransport> {
    transport: T,
    scanner: PortScanner,
    session: SharedSession,
    baud_rate: u32,
    timings: LinkTimings,
}

impl<T: SerialTransport> HandshakeProtocol<T> {
    pub fn new(
        transport: T,
        scanner: PortScanner,
        session: SharedSession,
        baud_rate: u32,
        timings: LinkTimings,
    ) -> Self {
        Self {
            transport,
            scanner,
            session,
            baud_rate,
            timings,
        }
    }

    /// Scans until a candidate answers. Returns the reader for the live port.
    ///
    /// Only [`LinkError::NoPortsAvailable`] escapes; enumeration errors and
    /// per-candidate failures are logged and the scan carries on.
    pub fn connect(&mut self) -> Result<PortReader, LinkError> {
        loop {
            let candidate = match self.scanner.next_candidate(&self.transport) {
                Ok(candidate) => candidate,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Port enumeration failed: {}", e);
                    thread::sleep(self.timings.settle);
                    continue;
                }
            };
            info!("Connecting to -> {}", candidate);
            thread::sleep(self.timings.settle);

            match self.attempt(&candidate) {
                Ok(reader) => {
                    info!("Connected to device on {}", candidate);
                    return Ok(reader);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("{}", e);
                    self.session.mark_disconnected();
                }
            }
        }
    }

    /// One handshake episode against a single port.
    pub fn attempt(&mut self, candidate: &str) -> Result<PortReader, LinkError> {
        self.session
            .begin_handshake(candidate, self.timings.handshake_retries);

        let mut link = self.transport.open(candidate, self.baud_rate)?;
        link.clear()?;
        link.write_byte(HEARTBEAT)?;

        let reader = PortReader::spawn(
            candidate,
            link,
            LineDecoder::new(self.session.clone()),
        );

        loop {
            thread::sleep(self.timings.handshake_poll);
            if self.session.is_connected() {
                return Ok(reader);
            }
            match self.session.consume_attempt() {
                Some(0) | None => break,
                Some(left) => debug!(
                    "Waiting for response from device on {} ({} left)",
                    candidate, left
                ),
            }
        }
        // A heartbeat may have landed between the check and the countdown.
        if self.session.is_connected() {
            return Ok(reader);
        }

        reader.close();
        thread::sleep(self.timings.settle);
        Err(LinkError::HandshakeTimeout(candidate.to_string()))
    }
}
