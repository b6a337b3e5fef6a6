use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Append-only series of millisecond samples, shared by every virtual user.
#[derive(Debug)]
pub struct Trend {
    name: String,
    samples: Mutex<Vec<f64>>,
}

impl Trend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one sample and return its value in milliseconds.
    pub fn add(&self, value: Duration) -> f64 {
        let ms = value.as_nanos() as f64 / 1_000_000.0;
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ms);
        ms
    }

    pub fn count(&self) -> u64 {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len() as u64
    }

    pub fn summary(&self) -> TrendSummary {
        let mut sorted = self
            .samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len() as u64;
        let avg = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };

        TrendSummary {
            name: self.name.clone(),
            count,
            min: sorted.first().copied().unwrap_or(0.0),
            max: sorted.last().copied().unwrap_or(0.0),
            avg,
            med: percentile(&sorted, 50),
            p90: percentile(&sorted, 90),
            p95: percentile(&sorted, 95),
        }
    }
}

/// Nearest-rank percentile over an already sorted slice.
fn percentile(sorted: &[f64], p: u64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (sorted.len() as u64 * p).div_ceil(100).max(1);
    sorted[(rank - 1) as usize]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub name: String,
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub med: f64,
    pub p90: f64,
    pub p95: f64,
}

/// Named non-fatal assertion. Failures are tallied, never raised.
#[derive(Debug)]
pub struct Check {
    name: String,
    passes: AtomicU64,
    fails: AtomicU64,
}

impl Check {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passes: AtomicU64::new(0),
            fails: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&self, passed: bool) -> bool {
        if passed {
            self.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fails.fetch_add(1, Ordering::Relaxed);
        }
        passed
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn fails(&self) -> u64 {
        self.fails.load(Ordering::Relaxed)
    }

    pub fn summary(&self) -> CheckSummary {
        let passes = self.passes();
        let fails = self.fails();
        let total = passes + fails;
        CheckSummary {
            name: self.name.clone(),
            passes,
            fails,
            pass_rate_pct: if total > 0 { (passes * 100) / total } else { 0 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
    pub pass_rate_pct: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_trend_records_milliseconds() {
        let trend = Trend::new("my_trend");
        let sample = trend.add(Duration::from_millis(5) + Duration::from_millis(12));
        assert_eq!(sample, 17.0);
        assert_eq!(trend.count(), 1);
        assert_eq!(trend.name(), "my_trend");
    }

    #[test]
    fn test_trend_summary() {
        let trend = Trend::new("latency");
        for ms in 1..=100 {
            trend.add(Duration::from_millis(ms));
        }

        let summary = trend.summary();
        assert_eq!(summary.count, 100);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 100.0);
        assert_eq!(summary.avg, 50.5);
        assert_eq!(summary.med, 50.0);
        assert_eq!(summary.p90, 90.0);
        assert_eq!(summary.p95, 95.0);
    }

    #[test]
    fn test_empty_trend_summary() {
        let summary = Trend::new("empty").summary();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.p95, 0.0);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let trend = Arc::new(Trend::new("shared"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let trend = trend.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        trend.add(Duration::from_micros(250));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(trend.count(), 4000);
    }

    #[test]
    fn test_check_tally() {
        let check = Check::new("status was 201");
        assert!(check.record(true));
        assert!(check.record(true));
        assert!(!check.record(false));

        let summary = check.summary();
        assert_eq!(summary.name, "status was 201");
        assert_eq!(summary.passes, 2);
        assert_eq!(summary.fails, 1);
        assert_eq!(summary.pass_rate_pct, 66);
    }
}
