//! MIDI output for the bridge
//!
//! The `midir` output connection lives on its own thread and is fed through a
//! `crossbeam` channel, so note cycles running on dispatch threads never touch
//! the connection directly. Everything upstream talks to a [`NoteSink`].

use crate::error::MidiError;
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};
use midir::{MidiOutput, MidiOutputConnection};
use std::thread::{self, JoinHandle};

pub type Result<T> = std::result::Result<T, MidiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
}

impl MidiMessage {
    pub fn to_bytes(self) -> [u8; 3] {
        match self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => [0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
        }
    }
}

/// Where played notes end up. No acknowledgement is expected.
pub trait NoteSink: Send + Sync {
    fn note_on(&self, channel: u8, note: u8, velocity: u8) -> Result<()>;
    fn note_off(&self, channel: u8, note: u8, velocity: u8) -> Result<()>;
}

pub struct MidiOutputManager {
    connection: Option<MidiOutputConnection>,
    port_name: Option<String>,
}

impl Default for MidiOutputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiOutputManager {
    pub fn new() -> Self {
        MidiOutputManager {
            connection: None,
            port_name: None,
        }
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn connect_to_first_available(&mut self) -> Result<()> {
        let midi_out = Self::midi_output()?;

        let out_ports = midi_out.ports();
        let port = out_ports
            .first()
            .ok_or_else(|| MidiError::ConnectionError("no MIDI output ports available".into()))?;
        let port_name = midi_out
            .port_name(port)
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;

        info!("Connecting to MIDI output port: {}", port_name);
        let connection = midi_out
            .connect(port, "solfa-bridge-output-conn")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;
        self.connection = Some(connection);
        self.port_name = Some(port_name);
        Ok(())
    }

    /// Connects to the first output whose name contains `device_name`.
    pub fn connect_to_device(&mut self, device_name: &str) -> Result<()> {
        let midi_out = Self::midi_output()?;

        let out_ports = midi_out.ports();
        let port = out_ports
            .iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .unwrap_or_default()
                    .contains(device_name)
            })
            .ok_or_else(|| {
                error!("MIDI output device '{}' not found", device_name);
                MidiError::ConnectionError(format!("MIDI output '{}' not found", device_name))
            })?;

        let port_name = midi_out
            .port_name(port)
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;
        info!("Connecting to MIDI output port: {}", port_name);

        let connection = midi_out
            .connect(port, "solfa-bridge-output-conn")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;
        self.connection = Some(connection);
        self.port_name = Some(port_name);
        Ok(())
    }

    pub fn send(&mut self, message: MidiMessage) -> Result<()> {
        let conn = self
            .connection
            .as_mut()
            .ok_or_else(|| MidiError::SendError("MIDI output not connected".into()))?;

        debug!("Sending {:?}", message);
        conn.send(&message.to_bytes())
            .map_err(|e| MidiError::SendError(e.to_string()))
    }

    pub fn list_available_ports() -> Result<Vec<String>> {
        let midi_out = MidiOutput::new("solfa-bridge-port-lister")
            .map_err(|e| MidiError::ConnectionError(e.to_string()))?;
        let ports = midi_out.ports();
        Ok(ports
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect())
    }

    fn midi_output() -> Result<MidiOutput> {
        MidiOutput::new("solfa-bridge-output").map_err(|e| MidiError::ConnectionError(e.to_string()))
    }
}

/// [`NoteSink`] backed by a channel into the MIDI output thread.
#[derive(Clone)]
pub struct MidiOutputSink {
    tx: Sender<MidiMessage>,
}

impl MidiOutputSink {
    pub fn new(tx: Sender<MidiMessage>) -> Self {
        Self { tx }
    }

    fn forward(&self, message: MidiMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| MidiError::SendError("MIDI output thread has stopped".into()))
    }
}

impl NoteSink for MidiOutputSink {
    fn note_on(&self, channel: u8, note: u8, velocity: u8) -> Result<()> {
        self.forward(MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        })
    }

    fn note_off(&self, channel: u8, note: u8, velocity: u8) -> Result<()> {
        self.forward(MidiMessage::NoteOff {
            channel,
            note,
            velocity,
        })
    }
}

fn process_midi_messages(output_manager: &mut MidiOutputManager, rx: Receiver<MidiMessage>) {
    info!("MIDI output thread started");

    while let Ok(message) = rx.recv() {
        if let Err(e) = output_manager.send(message) {
            error!("Failed to send MIDI message: {}", e);
        }
    }

    info!("MIDI output thread stopping");
}

/// Moves a connected manager onto its own thread and returns the sink feeding it.
/// The thread exits once every sink clone has been dropped.
pub fn run_midi_output_thread(
    mut output_manager: MidiOutputManager,
) -> (MidiOutputSink, JoinHandle<()>) {
    let (tx, rx) = unbounded();
    let handle = thread::spawn(move || {
        process_midi_messages(&mut output_manager, rx);
    });
    (MidiOutputSink::new(tx), handle)
}
