use thiserror::Error;

/// Errors raised while discovering or talking to the glove.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Enumeration found no serial ports at all. Fatal.
    #[error("no serial ports available")]
    NoPortsAvailable,
    /// The candidate opened but never answered the hello.
    #[error("no response from device on {0}")]
    HandshakeTimeout(String),
    /// The candidate could not be opened (busy, permissions, removed mid-scan).
    #[error("failed to open {port}: {reason}")]
    TransportOpen { port: String, reason: String },
    /// Port enumeration itself failed.
    #[error("serial enumeration failed: {0}")]
    Enumeration(String),
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Whether the supervisor should give up rather than try the next candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::NoPortsAvailable)
    }
}

/// Custom error type for MIDI operations
#[derive(Debug, Error)]
pub enum MidiError {
    /// Error when sending a MIDI message
    #[error("MIDI send error: {0}")]
    SendError(String),
    /// Error when connecting to a MIDI device
    #[error("MIDI connection error: {0}")]
    ConnectionError(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
