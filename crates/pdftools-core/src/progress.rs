//! Progress reporting
//!
//! Operations report an integer percentage (0-100) through a
//! `ProgressSink`. `Progress` wraps a sink for the duration of one operation
//! and keeps the emitted values non-decreasing.

/// Receiver of progress percentages
pub trait ProgressSink {
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> ProgressSink for F {
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// Sink that drops every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Progress of a single operation
pub struct Progress<'a> {
    sink: &'a mut dyn ProgressSink,
    current: u8,
}

impl<'a> Progress<'a> {
    /// Wrap a sink and emit the starting value of 0
    pub fn start(sink: &'a mut dyn ProgressSink) -> Self {
        sink.report(0);
        Self { sink, current: 0 }
    }

    /// Report `done` of `total` units as a percentage
    pub fn step(&mut self, done: usize, total: usize) {
        self.set(percent_of(done, total));
    }

    /// Emit `percent` unless it would move progress backwards
    pub fn set(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent >= self.current {
            self.current = percent;
            self.sink.report(percent);
        }
    }

    pub fn finish(&mut self) {
        if self.current < 100 {
            self.set(100);
        }
    }

    pub fn current(&self) -> u8 {
        self.current
    }
}

/// `done / total * 100`, clamped to 0..=100; an empty job counts as done
pub fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 4), 0);
        assert_eq!(percent_of(1, 4), 25);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn test_progress_ignores_regressions() {
        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        {
            let mut progress = Progress::start(&mut sink);
            progress.set(50);
            progress.set(20);
            progress.finish();
        }
        assert_eq!(seen, vec![0, 50, 100]);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut seen = Vec::new();
        let mut sink = |p: u8| seen.push(p);
        {
            let mut progress = Progress::start(&mut sink);
            progress.step(2, 2);
            progress.finish();
        }
        assert_eq!(seen, vec![0, 100]);
    }

    proptest! {
        #[test]
        fn prop_steps_are_monotonic_and_end_at_100(total in 1usize..500) {
            let mut seen = Vec::new();
            let mut sink = |p: u8| seen.push(p);
            {
                let mut progress = Progress::start(&mut sink);
                for i in 0..total {
                    progress.step(i + 1, total);
                }
                progress.finish();
            }
            prop_assert!(seen.windows(2).all(|w| w[0] <= w[1]));
            prop_assert_eq!(*seen.last().unwrap(), 100);
        }
    }
}
