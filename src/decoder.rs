//! Framing and classification of the glove's byte stream.
//!
//! The glove terminates every chunk it sends with the heartbeat byte `'H'`,
//! so the same delimiter both frames lines and proves liveness. A chunk is
//! handed on with its trailing `'H'` still attached.

use crate::session::SharedSession;
use log::{debug, info, trace};

/// Heartbeat byte, also the frame delimiter and the outbound hello.
pub const HEARTBEAT: u8 = b'H';

/// Token the glove prints once its own setup has finished.
pub const SETUP_COMPLETE_MARKER: &str = "Complete";

/// Longest undelimited run kept before the partial frame is discarded.
pub const MAX_FRAME: usize = 4096;

/// Accumulates bytes until the heartbeat delimiter is seen.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and returns every chunk completed by them.
    ///
    /// A partial frame that grows past [`MAX_FRAME`] is dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            self.buf.push(byte);
            if byte == HEARTBEAT {
                lines.push(String::from_utf8_lossy(&self.buf).into_owned());
                self.buf.clear();
            } else if self.buf.len() > MAX_FRAME {
                debug!("Discarding {} bytes without a delimiter", self.buf.len());
                self.buf.clear();
            }
        }
        lines
    }

    /// Bytes received since the last delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// What a decoded line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Heartbeat,
    SetupProgress,
    SetupComplete,
    Note(String),
    Empty,
}

/// Classifies a single line against the current setup status.
pub fn classify(line: &str, setup_complete: bool) -> LineKind {
    if line.trim() == "H" {
        return LineKind::Heartbeat;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return LineKind::Empty;
    }

    if !setup_complete {
        let marker_at = |from_end: usize| {
            tokens
                .len()
                .checked_sub(from_end)
                .map(|i| tokens[i] == SETUP_COMPLETE_MARKER)
                .unwrap_or(false)
        };
        return if marker_at(1) || marker_at(2) {
            LineKind::SetupComplete
        } else {
            LineKind::SetupProgress
        };
    }

    LineKind::Note(tokens[0].to_string())
}

/// Routes classified lines into the session.
#[derive(Clone)]
pub struct LineDecoder {
    session: SharedSession,
}

impl LineDecoder {
    pub fn new(session: SharedSession) -> Self {
        Self { session }
    }

    pub fn feed(&self, line: &str) -> LineKind {
        let kind = classify(line, self.session.setup_complete());
        match &kind {
            LineKind::Heartbeat => {
                if !self.session.record_heartbeat() {
                    trace!("Heartbeat with no active session ignored");
                }
            }
            LineKind::SetupProgress => debug!("Device setup: {}", line.trim()),
            LineKind::SetupComplete => {
                info!("Device setup complete");
                self.session.set_setup_complete();
            }
            LineKind::Note(note) => {
                trace!("Note token received: {}", note);
                self.session.set_next_note(note);
            }
            LineKind::Empty => {}
        }
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::NO_INPUT;
    use crate::session::{LinkState, Session};

    #[test]
    fn test_framer_splits_on_heartbeat() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"mi\r\n").is_empty());
        assert_eq!(framer.pending(), 4);

        let lines = framer.push(b"HHdo\r\nHfa");
        assert_eq!(lines, vec!["mi\r\nH", "H", "do\r\nH"]);
        assert_eq!(framer.pending(), 2);
    }

    #[test]
    fn test_framer_drops_runaway_partial_frame() {
        let mut framer = LineFramer::new();
        let noise = vec![b'x'; MAX_FRAME + 10];
        assert!(framer.push(&noise).is_empty());
        assert!(framer.pending() <= MAX_FRAME);

        let lines = framer.push(b"re\r\nH");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].len() <= MAX_FRAME + 1);
        assert!(lines[0].ends_with("re\r\nH"));
    }

    #[test]
    fn test_framer_survives_invalid_utf8() {
        let mut framer = LineFramer::new();
        let lines = framer.push(&[0xff, 0xfe, b'H']);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with('H'));
    }

    #[test]
    fn test_heartbeat_classification() {
        assert_eq!(classify("H", false), LineKind::Heartbeat);
        assert_eq!(classify("\r\nH", true), LineKind::Heartbeat);
        assert_ne!(classify("HH", true), LineKind::Heartbeat);
    }

    #[test]
    fn test_completion_marker_positions() {
        assert_eq!(
            classify("BNO055 Setup Complete", false),
            LineKind::SetupComplete
        );
        assert_eq!(
            classify("Setup Complete !", false),
            LineKind::SetupComplete
        );
        assert_eq!(
            classify("Setup Complete\r\nH", false),
            LineKind::SetupComplete
        );
        assert_eq!(
            classify("Complete calibration of sensor", false),
            LineKind::SetupProgress
        );
        assert_eq!(classify("Complete", false), LineKind::SetupComplete);
    }

    #[test]
    fn test_empty_lines_are_discarded() {
        assert_eq!(classify("", false), LineKind::Empty);
        assert_eq!(classify("  \r\n", true), LineKind::Empty);
    }

    #[test]
    fn test_note_uses_first_token() {
        assert_eq!(classify("mi extra", true), LineKind::Note("mi".into()));
        assert_eq!(classify("so\r\nH", true), LineKind::Note("so".into()));
    }

    #[test]
    fn test_notes_gated_by_setup() {
        let session = Session::shared();
        let decoder = LineDecoder::new(session.clone());

        decoder.feed("do");
        decoder.feed("re still calibrating");
        assert_eq!(session.next_note(), NO_INPUT);

        decoder.feed("Setup Complete");
        assert!(session.setup_complete());

        decoder.feed("fa");
        assert_eq!(session.next_note(), "fa");
    }

    #[test]
    fn test_heartbeat_feeds_link_state() {
        let session = Session::shared();
        let decoder = LineDecoder::new(session.clone());

        assert_eq!(decoder.feed("H"), LineKind::Heartbeat);
        assert_eq!(session.link_state(), LinkState::Disconnected);

        session.begin_handshake("A", 5);
        decoder.feed("H");
        assert!(session.is_connected());
    }

    #[test]
    fn test_heartbeat_does_not_touch_notes() {
        let session = Session::shared();
        session.set_setup_complete();
        let decoder = LineDecoder::new(session.clone());
        decoder.feed("la");
        decoder.feed("H");
        assert_eq!(session.next_note(), "la");
    }
}
