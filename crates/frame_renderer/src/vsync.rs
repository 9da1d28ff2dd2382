//! Optional present pacing. Only affects timing, never which frame is shown.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

pub trait PresentSync: Send + Sync {
    /// Called before a frame is presented.
    fn wait_for_present(&self);
}

/// Presents immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPresentSync;

impl PresentSync for NoPresentSync {
    fn wait_for_present(&self) {}
}

/// Sleeps until the next tick of a fixed refresh interval.
///
/// A caller that falls behind is rescheduled from now instead of catching up.
#[derive(Debug)]
pub struct IntervalPresentSync {
    interval: Duration,
    next_tick: Mutex<Option<Instant>>,
}

impl IntervalPresentSync {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: Mutex::new(None),
        }
    }

    /// `hz` of zero disables pacing.
    pub fn from_refresh_rate(hz: u32) -> Self {
        let interval = match hz {
            0 => Duration::ZERO,
            hz => Duration::from_nanos(1_000_000_000 / u64::from(hz)),
        };
        Self::new(interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl PresentSync for IntervalPresentSync {
    fn wait_for_present(&self) {
        if self.interval.is_zero() {
            return;
        }

        let wake = {
            let mut next_tick = self.next_tick.lock();
            let now = Instant::now();
            let wake = match *next_tick {
                Some(tick) if tick > now => tick,
                _ => now,
            };
            *next_tick = Some(wake + self.interval);
            wake
        };

        let now = Instant::now();
        if wake > now {
            std::thread::sleep(wake - now);
        }
    }
}
