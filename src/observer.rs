//! Hooks notified by the trainer as batches and epochs complete.
//!
//! Observers receive the network by shared reference and pull whatever they
//! need from its accessors (`epoch`, `last_error`, `epoch_error`). The order
//! in which several observers are notified is unspecified.

use crate::error::{Error, Result};
use crate::network::Network;
use crate::timer::Timer;

use std::collections::VecDeque;
use tracing::info;

pub trait Observer {
    /// Called after each batch has been propagated forward and scored.
    fn on_batch_complete(&mut self, _network: &Network) {}

    /// Called after every batch of an epoch has been trained on.
    fn on_epoch_complete(&mut self, _network: &Network) {}
}

/// Keeps the most recent epoch errors in a fixed-size window.
#[derive(Clone, Debug)]
pub struct ErrorStatistics {
    window: usize,
    recent: VecDeque<f64>,
    first: Option<f64>,
    epochs: usize,
}

impl ErrorStatistics {
    /// Tracks the last `window` epochs; a window of zero is treated as one.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        ErrorStatistics {
            window,
            recent: VecDeque::with_capacity(window),
            first: None,
            epochs: 0,
        }
    }

    pub fn record(&mut self, error: f64) {
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(error);
        self.first.get_or_insert(error);
        self.epochs += 1;
    }

    /// Number of epochs observed in total, not just inside the window.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// The error of the very first observed epoch.
    pub fn first(&self) -> Result<f64> {
        self.first.ok_or(Error::NoObservations)
    }

    pub fn latest(&self) -> Result<f64> {
        self.recent.back().copied().ok_or(Error::NoObservations)
    }

    pub fn mean(&self) -> Result<f64> {
        if self.recent.is_empty() {
            return Err(Error::NoObservations);
        }
        Ok(self.recent.iter().sum::<f64>() / self.recent.len() as f64)
    }

    pub fn min(&self) -> Result<f64> {
        self.recent
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |m| m.min(x))))
            .ok_or(Error::NoObservations)
    }

    pub fn max(&self) -> Result<f64> {
        self.recent
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |m| m.max(x))))
            .ok_or(Error::NoObservations)
    }
}

impl Observer for ErrorStatistics {
    fn on_epoch_complete(&mut self, network: &Network) {
        self.record(network.epoch_error());
    }
}

/// Logs the epoch error every `every` epochs.
#[derive(Debug)]
pub struct ErrorLogger {
    every: usize,
    timer: Option<Timer>,
}

impl ErrorLogger {
    pub fn new(every: usize) -> Self {
        ErrorLogger { every, timer: None }
    }

    /// Also reports the time elapsed since this call.
    pub fn with_timer(mut self) -> Self {
        self.timer = Some(Timer::started());
        self
    }
}

impl Observer for ErrorLogger {
    fn on_epoch_complete(&mut self, network: &Network) {
        let epoch = network.epoch();
        if self.every == 0 || epoch % self.every != 0 {
            return;
        }
        match self.timer {
            Some(ref timer) => info!(
                epoch,
                error = network.epoch_error(),
                elapsed = %timer.elapsed_string(),
                "training progress"
            ),
            None => info!(epoch, error = network.epoch_error(), "training progress"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_latest_values() {
        let mut stats = ErrorStatistics::new(3);
        assert_eq!(stats.mean(), Err(Error::NoObservations));
        for &e in &[5.0, 4.0, 3.0, 2.0] {
            stats.record(e);
        }
        assert_eq!(stats.epochs(), 4);
        assert_eq!(stats.first(), Ok(5.0));
        assert_eq!(stats.latest(), Ok(2.0));
        assert_eq!(stats.mean(), Ok(3.0));
        assert_eq!(stats.min(), Ok(2.0));
        assert_eq!(stats.max(), Ok(4.0));
    }
}
