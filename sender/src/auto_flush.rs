use std::time::{Duration, Instant};

use ilp_common::config::AutoFlushConfig;

/// Tracks rows-since-flush and time-since-flush to decide when a `Sender`
/// should flush automatically (spec.md §6.2).
pub struct AutoFlushState {
    enabled: bool,
    rows_threshold: u64,
    interval: Option<Duration>,
    rows_since_flush: u64,
    last_flush: Instant,
}

impl AutoFlushState {
    pub fn new(config: &AutoFlushConfig, default_rows_threshold: u64) -> Self {
        AutoFlushState {
            enabled: config.enabled,
            rows_threshold: config.rows_threshold.unwrap_or(default_rows_threshold),
            interval: config.interval_millis.map(Duration::from_millis),
            rows_since_flush: 0,
            last_flush: Instant::now(),
        }
    }

    pub fn record_row(&mut self) {
        self.rows_since_flush += 1;
    }

    pub fn should_flush(&self) -> bool {
        if !self.enabled {
            return false;
        }
        if self.rows_since_flush >= self.rows_threshold {
            return true;
        }
        match self.interval {
            Some(interval) => self.last_flush.elapsed() >= interval,
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.rows_since_flush = 0;
        self.last_flush = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_once_row_threshold_reached() {
        let config = AutoFlushConfig { enabled: true, rows_threshold: Some(2), interval_millis: None };
        let mut state = AutoFlushState::new(&config, 100);
        state.record_row();
        assert!(!state.should_flush());
        state.record_row();
        assert!(state.should_flush());
    }

    #[test]
    fn disabled_never_flushes() {
        let config = AutoFlushConfig { enabled: false, rows_threshold: Some(1), interval_millis: None };
        let mut state = AutoFlushState::new(&config, 100);
        state.record_row();
        assert!(!state.should_flush());
    }

    #[test]
    fn reset_clears_row_count() {
        let config = AutoFlushConfig { enabled: true, rows_threshold: Some(1), interval_millis: None };
        let mut state = AutoFlushState::new(&config, 100);
        state.record_row();
        assert!(state.should_flush());
        state.reset();
        assert!(!state.should_flush());
    }

    #[test]
    fn default_rows_threshold_used_when_unset() {
        let config = AutoFlushConfig { enabled: true, rows_threshold: None, interval_millis: None };
        let mut state = AutoFlushState::new(&config, 2);
        state.record_row();
        state.record_row();
        assert!(state.should_flush());
    }
}
