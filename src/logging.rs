use simplelog::*;
use std::fs::{self, OpenOptions};
use std::io::{Error, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();
static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// `$HOME/.local/share/solfa-bridge/logs`
pub fn log_dir() -> Result<PathBuf, Error> {
    let home = std::env::var("HOME")
        .map_err(|_| Error::new(ErrorKind::NotFound, "HOME environment variable not set"))?;

    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("solfa-bridge")
        .join("logs"))
}

fn init_file_logger() -> Result<(), Error> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("app.log"))?;

    CombinedLogger::init(vec![WriteLogger::new(
        LevelFilter::Debug,
        Config::default(),
        log_file,
    )])
    .map_err(|e| Error::new(ErrorKind::Other, e))
}

/// Logs to a file so the terminal stays free for the display. Falls back to
/// `env_logger` on stderr when no log file can be opened.
pub fn init_logger() -> Result<(), Error> {
    INIT.call_once(|| {
        let installed = match init_file_logger() {
            Ok(()) => true,
            Err(file_err) => {
                let fallback = env_logger::Builder::from_env(
                    env_logger::Env::default().default_filter_or("info"),
                )
                .try_init();
                if fallback.is_ok() {
                    log::warn!("File logging unavailable ({}), logging to stderr", file_err);
                }
                fallback.is_ok()
            }
        };
        LOGGER_INITIALIZED.store(installed, Ordering::SeqCst);
    });

    if LOGGER_INITIALIZED.load(Ordering::SeqCst) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Other, "Logger initialization failed"))
    }
}
