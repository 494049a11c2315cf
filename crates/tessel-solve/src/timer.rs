use std::time::{Duration, Instant};

/// Logs the wall time of a scope at `info` level when dropped.
pub(crate) struct ScopedTimer {
    label: String,
    start: Instant,
}

impl ScopedTimer {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::info!("{}: {:.3} ms", self.label, self.start.elapsed().as_secs_f64() * 1e3);
    }
}
