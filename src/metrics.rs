//! Timing of served operations.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};

pub const DEFAULT_HISTORY: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub operation: String,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    pub failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationStats {
    pub count: usize,
    pub failures: usize,
    pub avg: Duration,
    pub min: Duration,
    pub max: Duration,
}

/// Keeps the most recent measurements, oldest dropped first.
#[derive(Debug)]
pub struct PerformanceMonitor {
    samples: VecDeque<Measurement>,
    capacity: usize,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl PerformanceMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY)),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, operation: &str, duration: Duration, failed: bool) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Measurement {
            operation: operation.to_string(),
            duration,
            timestamp: Utc::now(),
            failed,
        });
    }

    pub fn measurements_for<'a>(&'a self, operation: &'a str) -> impl Iterator<Item = &'a Measurement> {
        self.samples.iter().filter(move |m| m.operation == operation)
    }

    pub fn average(&self, operation: &str) -> Option<Duration> {
        self.summary().get(operation).map(|stats| stats.avg)
    }

    /// Per-operation statistics over the retained history.
    pub fn summary(&self) -> BTreeMap<String, OperationStats> {
        let mut totals: BTreeMap<String, (OperationStats, Duration)> = BTreeMap::new();

        for m in &self.samples {
            let (stats, total) = totals.entry(m.operation.clone()).or_insert((
                OperationStats {
                    count: 0,
                    failures: 0,
                    avg: Duration::ZERO,
                    min: Duration::MAX,
                    max: Duration::ZERO,
                },
                Duration::ZERO,
            ));
            stats.count += 1;
            stats.failures += usize::from(m.failed);
            stats.min = stats.min.min(m.duration);
            stats.max = stats.max.max(m.duration);
            *total += m.duration;
        }

        totals
            .into_iter()
            .map(|(operation, (mut stats, total))| {
                stats.avg = total / u32::try_from(stats.count).unwrap_or(u32::MAX);
                (operation, stats)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
