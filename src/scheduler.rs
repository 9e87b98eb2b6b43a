use std::thread;

/// Seam for fire-and-forget work such as note on/off cycles.
pub trait Scheduler: Send + Sync {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static;
}

pub struct ThreadScheduler;

impl ThreadScheduler {
    pub fn new() -> Self {
        ThreadScheduler
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ThreadScheduler {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let spawned = thread::Builder::new()
            .name("note-dispatch".into())
            .spawn(f);
        if let Err(e) = spawned {
            log::error!("Failed to spawn dispatch thread: {}", e);
        }
    }
}

/// Runs the task on the caller's thread. Used where ordering must be deterministic.
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        f();
    }
}
