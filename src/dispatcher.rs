//! Turns note changes into MIDI on/off cycles.

use crate::midi::NoteSink;
use crate::notes::map_note;
use crate::scheduler::Scheduler;
use crate::session::SharedSession;
use log::{debug, error};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const NOTE_CHANNEL: u8 = 0;
pub const NOTE_VELOCITY: u8 = 127;
pub const NOTE_HOLD: Duration = Duration::from_millis(200);

pub struct NoteDispatcher<S: Scheduler> {
    session: SharedSession,
    sink: Arc<dyn NoteSink>,
    scheduler: S,
    root: u8,
    hold: Duration,
}

impl<S: Scheduler> NoteDispatcher<S> {
    pub fn new(
        session: SharedSession,
        sink: Arc<dyn NoteSink>,
        scheduler: S,
        root: u8,
        hold: Duration,
    ) -> Self {
        Self {
            session,
            sink,
            scheduler,
            root,
            hold,
        }
    }

    /// Runs once per update tick. If `next` moved away from `current`, promotes
    /// it and launches a note cycle without waiting for it.
    ///
    /// Returns the note that became current, if any.
    pub fn update(&self) -> Option<String> {
        let note = self.session.promote_next()?;
        debug!("Current note is now {}", note);

        match map_note(&note, self.root) {
            Some(pitch) => {
                let sink = self.sink.clone();
                let hold = self.hold;
                self.scheduler
                    .spawn(move || play_note(sink.as_ref(), pitch, hold));
            }
            None => debug!("No MIDI mapping for {:?}", note),
        }
        Some(note)
    }
}

/// One full on/off cycle. Sink failures are logged, never retried.
pub fn play_note(sink: &dyn NoteSink, pitch: u8, hold: Duration) {
    if let Err(e) = sink.note_on(NOTE_CHANNEL, pitch, NOTE_VELOCITY) {
        error!("Note on {} failed: {}", pitch, e);
    }
    thread::sleep(hold);
    if let Err(e) = sink.note_off(NOTE_CHANNEL, pitch, NOTE_VELOCITY) {
        error!("Note off {} failed: {}", pitch, e);
    }
}
