use chrono::Timelike;
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of the local time of day used for staleness decisions.
pub trait Clock: Send + Sync {
    /// Current local hour, 0..=23.
    fn local_hour(&self) -> u32;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn local_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    hour: AtomicU32,
}

impl FixedClock {
    pub fn at(hour: u32) -> Self {
        Self { hour: AtomicU32::new(hour) }
    }

    pub fn set_hour(&self, hour: u32) {
        self.hour.store(hour, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn local_hour(&self) -> u32 {
        self.hour.load(Ordering::SeqCst)
    }
}
