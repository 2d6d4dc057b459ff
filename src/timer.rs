//! Wall-clock timing for progress reports.

use std::time::{Duration, Instant};

/// A stopwatch that can be started and stopped repeatedly, accumulating the
/// time spent running.
#[derive(Clone, Debug, Default)]
pub struct Timer {
    started: Option<Instant>,
    accumulated: Duration,
}

impl Timer {
    pub fn new() -> Self {
        Timer::default()
    }

    /// A timer that is already running.
    pub fn started() -> Self {
        let mut timer = Timer::new();
        timer.start();
        timer
    }

    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Stops the timer and returns the total elapsed time.
    pub fn stop(&mut self) -> Duration {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
        self.accumulated
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Total time spent running, including the current run if any.
    pub fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => self.accumulated + started.elapsed(),
            None => self.accumulated,
        }
    }

    /// The elapsed time formatted like `1h 02m 03.456s`, leaving out
    /// leading zero units.
    pub fn elapsed_string(&self) -> String {
        format_duration(self.elapsed())
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let secs = (total % 60) as f64 + f64::from(duration.subsec_millis()) / 1000.0;
    let mins = (total / 60) % 60;
    let hours = total / 3600;
    if hours > 0 {
        format!("{}h {:02}m {:06.3}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:06.3}s", mins, secs)
    } else {
        format!("{:.3}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_millis(2345)), "2.345s");
        assert_eq!(format_duration(Duration::from_millis(62_345)), "1m 02.345s");
        assert_eq!(
            format_duration(Duration::from_millis(3_723_456)),
            "1h 02m 03.456s"
        );
    }

    #[test]
    fn stopped_timer_does_not_advance() {
        let mut timer = Timer::started();
        assert!(timer.is_running());
        let total = timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(), total);
    }
}
