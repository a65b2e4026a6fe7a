use std::time::Duration;

/// Summary of recent frame durations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub average: Duration,
    pub min: Duration,
    pub max: Duration,
    pub samples: usize,
}

impl FrameStats {
    pub fn fps(&self) -> f64 {
        let secs = self.average.as_secs_f64();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }
}

/// Rolling window over the last `capacity` frame deltas.
#[derive(Debug)]
pub struct FrameTimer {
    window: Vec<Duration>,
    next: usize,
    len: usize,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: vec![Duration::ZERO; capacity.max(1)],
            next: 0,
            len: 0,
        }
    }

    pub fn record(&mut self, delta: Duration) {
        self.window[self.next] = delta;
        self.next = (self.next + 1) % self.window.len();
        self.len = (self.len + 1).min(self.window.len());
    }

    pub fn count(&self) -> usize {
        self.len
    }

    pub fn stats(&self) -> FrameStats {
        let recent = &self.window[..self.len];
        if recent.is_empty() {
            return FrameStats::default();
        }
        FrameStats {
            average: recent.iter().sum::<Duration>() / recent.len() as u32,
            min: recent.iter().copied().min().unwrap_or_default(),
            max: recent.iter().copied().max().unwrap_or_default(),
            samples: recent.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn empty_timer_reports_zero() {
        let timer = FrameTimer::new(4);
        assert_eq!(timer.stats(), FrameStats::default());
        assert_eq!(timer.stats().fps(), 0.0);
    }

    #[test]
    fn summarizes_window() {
        let mut timer = FrameTimer::new(3);
        for n in [10, 20, 30] {
            timer.record(ms(n));
        }
        let stats = timer.stats();
        assert_eq!(stats.average, ms(20));
        assert_eq!(stats.min, ms(10));
        assert_eq!(stats.max, ms(30));
        assert!((stats.fps() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn oldest_sample_falls_out() {
        let mut timer = FrameTimer::new(2);
        for n in [10, 20, 30] {
            timer.record(ms(n));
        }
        assert_eq!(timer.count(), 2);
        assert_eq!(timer.stats().average, ms(25));
        assert_eq!(timer.stats().min, ms(20));
    }
}
