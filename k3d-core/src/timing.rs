/// Wall-clock source and rolling frame-rate estimate
use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Frame rate assumed until the first full second has been counted
pub const NOMINAL_FPS: f64 = 60.0;

/// Whole wall-clock seconds, used only to bucket frames
pub trait Clock {
    fn now_secs(&self) -> u64;
}

/// Reads the system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to; clones share the same time
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    secs: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: u64) {
        self.secs.set(self.secs.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.secs.get()
    }
}

/// Counts frames and publishes the count each time the second changes
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    second: u64,
    fps: f64,
}

impl FpsCounter {
    pub fn new(now_secs: u64) -> Self {
        Self {
            frames: 0,
            second: now_secs,
            fps: NOMINAL_FPS,
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Record one frame; returns true when a new estimate was published
    pub fn count_frame(&mut self, now_secs: u64) -> bool {
        self.frames += 1;
        if now_secs == self.second {
            return false;
        }
        self.second = now_secs;
        self.fps = self.frames as f64;
        self.frames = 0;
        true
    }
}
