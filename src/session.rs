//! Shared session state between the serial reader and the update loop.

use crate::notes::NO_INPUT;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default silence after which a connected glove is presumed gone.
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Connection status of the glove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Handshaking { candidate: String, attempts_left: u32 },
    Connected { last_heartbeat: Instant },
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected { .. })
    }
}

pub type SharedSession = Arc<Session>;

/// One bridge session: link status, device setup flag and the two note slots.
///
/// `next` is written by the decoder, `current` only by the dispatcher's
/// change detection.
pub struct Session {
    link: Mutex<LinkState>,
    setup_complete: AtomicBool,
    next_note: Mutex<String>,
    current_note: Mutex<String>,
    episodes: AtomicU64,
    candidates_tried: AtomicU64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            link: Mutex::new(LinkState::Disconnected),
            setup_complete: AtomicBool::new(false),
            next_note: Mutex::new(NO_INPUT.to_string()),
            current_note: Mutex::new(NO_INPUT.to_string()),
            episodes: AtomicU64::new(0),
            candidates_tried: AtomicU64::new(0),
        }
    }
}

// A poisoned lock only means another thread panicked mid-write of a plain value.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSession {
        Arc::new(Self::new())
    }

    pub fn link_state(&self) -> LinkState {
        lock(&self.link).clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.link).is_connected()
    }

    /// Records a heartbeat at the current time. See [`Session::record_heartbeat_at`].
    pub fn record_heartbeat(&self) -> bool {
        self.record_heartbeat_at(Instant::now())
    }

    /// Moves a handshaking or connected link to `Connected` stamped at `now`.
    ///
    /// Returns false and leaves the state alone when no session is active.
    pub fn record_heartbeat_at(&self, now: Instant) -> bool {
        let mut link = lock(&self.link);
        match *link {
            LinkState::Disconnected => false,
            _ => {
                *link = LinkState::Connected {
                    last_heartbeat: now,
                };
                true
            }
        }
    }

    /// True when never connected, or connected with silence longer than `threshold`.
    pub fn is_stale(&self, now: Instant, threshold: Duration) -> bool {
        match *lock(&self.link) {
            LinkState::Connected { last_heartbeat } => {
                now.saturating_duration_since(last_heartbeat) > threshold
            }
            _ => true,
        }
    }

    /// Starts a handshake episode against `candidate`; resets the setup flag.
    pub fn begin_handshake(&self, candidate: &str, attempts: u32) {
        self.setup_complete.store(false, Ordering::SeqCst);
        self.episodes.fetch_add(1, Ordering::SeqCst);
        self.candidates_tried.fetch_add(1, Ordering::SeqCst);
        *lock(&self.link) = LinkState::Handshaking {
            candidate: candidate.to_string(),
            attempts_left: attempts,
        };
    }

    /// Burns one poll of the current handshake. Returns the attempts remaining,
    /// or `None` if the link is no longer handshaking.
    pub fn consume_attempt(&self) -> Option<u32> {
        let mut link = lock(&self.link);
        match &mut *link {
            LinkState::Handshaking { attempts_left, .. } => {
                *attempts_left = attempts_left.saturating_sub(1);
                Some(*attempts_left)
            }
            _ => None,
        }
    }

    pub fn mark_disconnected(&self) {
        *lock(&self.link) = LinkState::Disconnected;
    }

    pub fn setup_complete(&self) -> bool {
        self.setup_complete.load(Ordering::SeqCst)
    }

    pub fn set_setup_complete(&self) {
        self.setup_complete.store(true, Ordering::SeqCst);
    }

    pub fn next_note(&self) -> String {
        lock(&self.next_note).clone()
    }

    pub fn set_next_note(&self, note: &str) {
        let mut next = lock(&self.next_note);
        next.clear();
        next.push_str(note);
    }

    pub fn current_note(&self) -> String {
        lock(&self.current_note).clone()
    }

    /// Promotes `next` into `current` if they differ, returning the new note.
    pub fn promote_next(&self) -> Option<String> {
        let next = self.next_note();
        let mut current = lock(&self.current_note);
        if *current == next {
            return None;
        }
        *current = next.clone();
        Some(next)
    }

    /// Drops both note slots back to the display sentinel.
    pub fn reset_notes(&self) {
        self.set_next_note(NO_INPUT);
        *lock(&self.current_note) = NO_INPUT.to_string();
    }

    /// Handshake episodes begun since the session was created.
    pub fn episodes(&self) -> u64 {
        self.episodes.load(Ordering::SeqCst)
    }

    /// Candidate ports attempted since the session was created.
    pub fn candidates_tried(&self) -> u64 {
        self.candidates_tried.load(Ordering::SeqCst)
    }
}
