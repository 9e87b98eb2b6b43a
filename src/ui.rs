// ui.rs

use crate::session::{LinkState, SharedSession};
use chrono::{DateTime, Local};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::thread;
use std::time::Duration;

/// Receives what should be on screen. Reads only; never drives the link.
pub trait NoteDisplay: Send {
    fn show_note(&mut self, note: &str);
    fn show_status(&mut self, status: &str);
}

pub fn status_line(state: &LinkState, since: Option<&DateTime<Local>>) -> String {
    match state {
        LinkState::Disconnected => "Disconnected".to_string(),
        LinkState::Handshaking {
            candidate,
            attempts_left,
        } => format!(
            "Waiting for response from device on {} ({} left)",
            candidate, attempts_left
        ),
        LinkState::Connected { .. } => match since {
            Some(at) => format!("Connected since {}", at.format("%H:%M:%S")),
            None => "Connected".to_string(),
        },
    }
}

fn create_note_spinner(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold} {spinner} {wide_msg:.magenta.bold}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Note");
    pb
}

fn create_link_spinner(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Link");
    pb
}

/// Terminal display built from two `indicatif` spinners.
pub struct SpinnerDisplay {
    #[allow(dead_code)]
    multi_progress: MultiProgress,
    note_pb: ProgressBar,
    link_pb: ProgressBar,
}

impl SpinnerDisplay {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let multi_progress = MultiProgress::with_draw_target(target);
        let note_pb = create_note_spinner(&multi_progress);
        let link_pb = create_link_spinner(&multi_progress);
        SpinnerDisplay {
            multi_progress,
            note_pb,
            link_pb,
        }
    }

    pub fn note(&self) -> String {
        self.note_pb.message()
    }

    pub fn status(&self) -> String {
        self.link_pb.message()
    }
}

impl Default for SpinnerDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteDisplay for SpinnerDisplay {
    fn show_note(&mut self, note: &str) {
        self.note_pb.set_message(note.to_string());
        self.note_pb.tick();
    }

    fn show_status(&mut self, status: &str) {
        self.link_pb.set_message(status.to_string());
        self.link_pb.tick();
    }
}

/// Polls the session and redraws `display` every `interval`, independently of
/// the supervisor, which blocks while handshaking.
pub fn run_note_display<D>(
    session: SharedSession,
    mut display: D,
    interval: Duration,
) -> thread::JoinHandle<()>
where
    D: NoteDisplay + 'static,
{
    thread::spawn(move || {
        let mut connected_since: Option<DateTime<Local>> = None;
        loop {
            let state = session.link_state();
            match (&state, connected_since.is_some()) {
                (LinkState::Connected { .. }, false) => connected_since = Some(Local::now()),
                (LinkState::Connected { .. }, true) => {}
                (_, _) => connected_since = None,
            }

            display.show_note(&session.current_note());
            display.show_status(&status_line(&state, connected_since.as_ref()));
            thread::sleep(interval);
        }
    })
}
