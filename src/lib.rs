pub mod cli;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod handshake;
pub mod logging;
pub mod midi;
pub mod notes;
pub mod scanner;
pub mod scheduler;
pub mod serial;
pub mod session;
pub mod supervisor;
pub mod ui;

pub use crate::cli::Args;
pub use crate::config::{BridgeConfig, LinkTimings};
pub use crate::error::{ConfigError, LinkError, MidiError};
pub use crate::scheduler::{Scheduler, ThreadScheduler};
pub use crate::session::{LinkState, Session, SharedSession};
