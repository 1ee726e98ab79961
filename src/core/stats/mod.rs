//! Rolling per-token return statistics feeding the shock detector.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// A bounded, time-indexed sequence of mid-price ticks for one token, plus the
/// derived statistics (mean/std/z-score) of its consecutive first-differences.
///
/// Below 5 ticks, or with a degenerate (zero) standard deviation, statistics
/// are undefined and [`PriceWindow::signal`] returns `None` rather than a
/// spurious z-score.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    window: Duration,
    ticks: VecDeque<(DateTime<Utc>, Decimal)>,
}

/// The statistics derived from a window's current contents, at the moment of
/// the latest tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub last_return: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub z_score: f64,
}

impl PriceWindow {
    #[must_use]
    pub fn new(window_ms: i64) -> Self {
        Self {
            window: Duration::milliseconds(window_ms),
            ticks: VecDeque::new(),
        }
    }

    /// Append a new `(timestamp, mid)` tick, drop anything older than the
    /// window, and return the freshly computed signal (if enough history
    /// exists).
    pub fn push(&mut self, timestamp: DateTime<Utc>, mid: Decimal) -> Option<Signal> {
        self.ticks.push_back((timestamp, mid));
        let cutoff = timestamp - self.window;
        while let Some((ts, _)) = self.ticks.front() {
            if *ts < cutoff {
                self.ticks.pop_front();
            } else {
                break;
            }
        }
        self.signal()
    }

    /// The current signal without mutating the window, or `None` if there
    /// isn't enough history yet.
    #[must_use]
    pub fn signal(&self) -> Option<Signal> {
        if self.ticks.len() < 5 {
            return None;
        }

        let diffs: Vec<f64> = self
            .ticks
            .iter()
            .map(|(_, mid)| mid.to_f64().unwrap_or(0.0))
            .collect::<Vec<_>>()
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect();

        let n = diffs.len() as f64;
        let mean = diffs.iter().sum::<f64>() / n;
        let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 {
            return None;
        }

        let last_return = *diffs.last().expect("diffs non-empty: len >= 4");
        let z_score = (last_return - mean) / std_dev;

        Some(Signal {
            last_return,
            mean,
            std_dev,
            z_score,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts(offset_ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::milliseconds(offset_ms)
    }

    #[test]
    fn fewer_than_five_ticks_yields_no_signal() {
        let mut window = PriceWindow::new(60_000);
        for i in 0..4 {
            assert!(window.push(ts(i * 100), dec!(0.50)).is_none());
        }
    }

    #[test]
    fn flat_prices_yield_no_signal_due_to_zero_std_dev() {
        let mut window = PriceWindow::new(60_000);
        let mut last = None;
        for i in 0..10 {
            last = window.push(ts(i * 100), dec!(0.50));
        }
        assert!(last.is_none());
    }

    #[test]
    fn a_sustained_move_produces_a_positive_z_score() {
        let mut window = PriceWindow::new(60_000);
        let prices = [dec!(0.50), dec!(0.50), dec!(0.50), dec!(0.50), dec!(0.50), dec!(0.58)];
        let mut last = None;
        for (i, price) in prices.iter().enumerate() {
            last = window.push(ts(i as i64 * 100), *price);
        }
        let signal = last.expect("six ticks with nonzero variance must produce a signal");
        assert!(signal.z_score > 0.0);
        assert!((signal.last_return - 0.08).abs() < 1e-9);
    }

    #[test]
    fn old_ticks_fall_out_of_the_window() {
        let mut window = PriceWindow::new(1_000);
        for i in 0..5 {
            window.push(ts(i * 100), dec!(0.50));
        }
        assert_eq!(window.len(), 5);
        window.push(ts(5_000), dec!(0.55));
        assert_eq!(window.len(), 1);
    }
}
