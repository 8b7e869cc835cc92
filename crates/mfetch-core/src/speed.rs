//! Throughput estimate from recent chunk fetch durations.
//!
//! An exponentially weighted moving average of per-chunk durations; the
//! estimate favors recent network conditions over the long-run average.

use std::time::Duration;

/// Default EWMA age in samples (`alpha = 2 / (age + 1)`).
pub const DEFAULT_AGE: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    chunk_size: u64,
    alpha: f64,
    /// Average duration in seconds; `None` until the first sample.
    average: Option<f64>,
}

impl SpeedEstimator {
    pub fn new(chunk_size: u64) -> Self {
        Self::with_age(chunk_size, DEFAULT_AGE)
    }

    /// `age` is roughly how many samples the average remembers. Values
    /// below 1 are treated as 1 (the average is then just the last sample).
    pub fn with_age(chunk_size: u64, age: f64) -> Self {
        let age = if age.is_finite() { age.max(1.0) } else { DEFAULT_AGE };
        Self {
            chunk_size,
            alpha: 2.0 / (age + 1.0),
            average: None,
        }
    }

    /// Feed the duration of one completed chunk.
    pub fn add(&mut self, duration: Duration) {
        let sample = duration.as_secs_f64();
        self.average = Some(match self.average {
            None => sample,
            Some(avg) => sample * self.alpha + avg * (1.0 - self.alpha),
        });
    }

    /// Current average chunk duration.
    pub fn average(&self) -> Option<Duration> {
        self.average.map(Duration::from_secs_f64)
    }

    /// Estimated throughput in bytes per second: chunk size over the average
    /// chunk duration. 0.0 until a non-zero duration has been observed.
    pub fn speed(&self) -> f64 {
        match self.average {
            Some(avg) if avg > 0.0 => self.chunk_size as f64 / avg,
            _ => 0.0,
        }
    }
}
