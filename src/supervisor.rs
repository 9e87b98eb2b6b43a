//! Top-level driver: liveness check, reconnection and note dispatch per tick.

use crate::config::LinkTimings;
use crate::dispatcher::NoteDispatcher;
use crate::error::LinkError;
use crate::handshake::{HandshakeProtocol, PortReader};
use crate::scheduler::Scheduler;
use crate::serial::SerialTransport;
use crate::session::SharedSession;
use log::{info, warn};
use std::thread;
use std::time::Instant;

pub struct ConnectionSupervisor<T: SerialTransport, S: Scheduler> {
    session: SharedSession,
    handshake: HandshakeProtocol<T>,
    dispatcher: NoteDispatcher<S>,
    timings: LinkTimings,
    active: Option<PortReader>,
}

impl<T: SerialTransport, S: Scheduler> ConnectionSupervisor<T, S> {
    pub fn new(
        session: SharedSession,
        handshake: HandshakeProtocol<T>,
        dispatcher: NoteDispatcher<S>,
        timings: LinkTimings,
    ) -> Self {
        Self {
            session,
            handshake,
            dispatcher,
            timings,
            active: None,
        }
    }

    /// Port of the live connection, if any.
    pub fn active_port(&self) -> Option<&str> {
        self.active.as_ref().map(PortReader::port)
    }

    pub fn tick(&mut self) -> Result<(), LinkError> {
        self.tick_at(Instant::now())
    }

    /// One update step evaluated at `now`: reconnect if the link is stale,
    /// then run note change detection.
    pub fn tick_at(&mut self, now: Instant) -> Result<(), LinkError> {
        if self
            .session
            .is_stale(now, self.timings.heartbeat_timeout)
        {
            self.reconnect()?;
        }
        self.dispatcher.update();
        Ok(())
    }

    /// Drops the current port and blocks until a new device answers.
    fn reconnect(&mut self) -> Result<(), LinkError> {
        if let Some(reader) = self.active.take() {
            warn!("Device disconnected from {}", reader.port());
            reader.close();
        }
        self.session.mark_disconnected();
        self.session.reset_notes();

        let reader = self.handshake.connect()?;
        info!("Link established on {}", reader.port());
        self.active = Some(reader);
        Ok(())
    }

    /// Ticks at the frame cadence until a fatal error.
    pub fn run(&mut self) -> Result<(), LinkError> {
        loop {
            self.tick()?;
            thread::sleep(self.timings.frame);
        }
    }
}
