use donutfield_common::CancellationToken;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// One iteration of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Zero-based frame number.
    pub index: u64,
    /// Time since the loop started. Only reported, nothing animates on it.
    pub elapsed: Duration,
    /// Time since the previous tick.
    pub delta: Duration,
}

/// Drives per-frame work until stopped, cancelled, or a frame limit is reached.
///
/// Each tick the caller updates camera damping and then renders; the loop
/// itself owns no scene state.
#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    started: Instant,
    last: Instant,
    frames: u64,
    frame_limit: Option<u64>,
    cancel: CancellationToken,
}

impl FrameLoop {
    pub fn new(cancel: CancellationToken) -> Self {
        Self::starting_at(Instant::now(), cancel)
    }

    pub fn starting_at(now: Instant, cancel: CancellationToken) -> Self {
        Self {
            state: LoopState::Running,
            started: now,
            last: now,
            frames: 0,
            frame_limit: None,
            cancel,
        }
    }

    pub fn with_frame_limit(mut self, limit: Option<u64>) -> Self {
        self.frame_limit = limit;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            tracing::debug!(frames = self.frames, "frame loop stopped");
        }
        self.state = LoopState::Stopped;
    }

    pub fn begin_frame(&mut self) -> Option<FrameTick> {
        self.begin_frame_at(Instant::now())
    }

    /// Start a frame at `now`. Returns `None` once the loop has stopped.
    pub fn begin_frame_at(&mut self, now: Instant) -> Option<FrameTick> {
        if self.cancel.is_cancelled() {
            self.stop();
        }
        if let Some(limit) = self.frame_limit {
            if self.frames >= limit {
                self.stop();
            }
        }
        if self.state == LoopState::Stopped {
            return None;
        }

        let tick = FrameTick {
            index: self.frames,
            elapsed: now.saturating_duration_since(self.started),
            delta: now.saturating_duration_since(self.last),
        };
        self.last = now;
        self.frames += 1;
        Some(tick)
    }
}
