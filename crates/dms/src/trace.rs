//! EAR history over a monitoring session

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default retained samples (~1 hour at 30fps)
pub const DEFAULT_TRACE_CAPACITY: usize = 108_000;

/// Recorded EAR samples, oldest first
#[derive(Debug, Clone)]
pub struct EarTrace {
    samples: VecDeque<f64>,
    capacity: usize,
}

/// End-of-session EAR statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub samples: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// PERCLOS: fraction of samples below the threshold
    pub closed_fraction: f64,
    pub ear_threshold: f64,
}

impl Default for EarTrace {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_CAPACITY)
    }
}

impl EarTrace {
    /// Create a trace keeping at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Record a sample, dropping the oldest when full
    pub fn push(&mut self, ear: f64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(ear);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Calculate PERCLOS (Percentage of Eye Closure)
    /// Higher PERCLOS indicates drowsiness
    pub fn closed_fraction(&self, ear_threshold: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }

        let closed_count = self.samples.iter().filter(|&&v| v < ear_threshold).count();
        closed_count as f64 / self.samples.len() as f64
    }

    /// Summarize the trace; `None` when nothing was recorded
    pub fn summary(&self, ear_threshold: f64) -> Option<TraceSummary> {
        if self.samples.is_empty() {
            return None;
        }

        let (min, max, sum) = self.samples.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
        );

        Some(TraceSummary {
            samples: self.samples.len(),
            min,
            max,
            mean: sum / self.samples.len() as f64,
            closed_fraction: self.closed_fraction(ear_threshold),
            ear_threshold,
        })
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_trace() {
        let trace = EarTrace::default();
        assert!(trace.is_empty());
        assert_eq!(trace.closed_fraction(0.25), 0.0);
        assert!(trace.summary(0.25).is_none());
    }

    #[test]
    fn test_summary() {
        let mut trace = EarTrace::default();
        for ear in [0.30, 0.10, 0.20, 0.40] {
            trace.push(ear);
        }

        let summary = trace.summary(0.25).unwrap();
        assert_eq!(summary.samples, 4);
        assert_eq!(summary.min, 0.10);
        assert_eq!(summary.max, 0.40);
        assert!((summary.mean - 0.25).abs() < 1e-12);
        assert_eq!(summary.closed_fraction, 0.5);
    }

    #[test]
    fn test_drops_oldest_when_full() {
        let mut trace = EarTrace::new(3);
        for i in 0..5 {
            trace.push(i as f64);
        }

        assert_eq!(trace.len(), 3);
        assert_eq!(trace.samples().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    }
}
