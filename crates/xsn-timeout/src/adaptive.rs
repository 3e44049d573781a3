// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-operation adaptive-timeout learner (`spec.md` §4.5, §9): a
//! Welford online mean/variance accumulator per named operation
//! (a state id, a `(state, event)` transition pair, or an action ref),
//! recommending `multiplier × (mean + k·stddev)` once enough samples
//! have been observed. `k` is fixed at 3 per `spec.md` §4.5; `multiplier`
//! defaults to 1.5 and is the one knob hosts configure.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Fixed per `spec.md` §4.5 ("k = 3").
const K: f64 = 3.0;

/// Samples above `recommended() * OUTLIER_CEILING_MULTIPLIER` are
/// rejected so one stall doesn't poison the running estimate, per the
/// Design Notes in `spec.md` §9. Before a baseline exists (first sample
/// for a key) nothing is rejected.
const OUTLIER_CEILING_MULTIPLIER: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default)]
struct Welford {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn update(&mut self, sample_ms: f64) {
        self.count += 1;
        let delta = sample_ms - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = sample_ms - self.mean;
        self.m2 += delta * delta2;
    }

    fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// A snapshot of one operation's observed latency statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveStats {
    pub samples: u64,
    pub mean_ms: f64,
    pub stddev_ms: f64,
}

/// Keeps one Welford accumulator per named operation, guarded by a
/// single lock — recording/reading is cheap and uncontended in practice
/// (one record per dispatch/action, not per microstep).
pub struct AdaptiveTimer {
    multiplier: f64,
    warmup_samples: usize,
    accumulators: Mutex<HashMap<String, Welford>>,
}

impl AdaptiveTimer {
    pub fn new(multiplier: f64, warmup_samples: usize) -> Self {
        Self { multiplier, warmup_samples, accumulators: Mutex::new(HashMap::new()) }
    }

    /// Records one observed latency for `key`. Rejects samples far
    /// beyond the current recommendation once a baseline exists, so a
    /// single stalled operation can't poison the running estimate.
    pub fn record(&self, key: &str, sample: Duration) {
        let sample_ms = sample.as_secs_f64() * 1000.0;
        let mut accumulators = self.accumulators.lock();
        if let Some(existing) = accumulators.get(key) {
            if existing.count > 0 {
                let ceiling = self.recommend(existing) * OUTLIER_CEILING_MULTIPLIER;
                if ceiling > 0.0 && sample_ms > ceiling {
                    tracing::debug!(key, sample_ms, ceiling, "adaptive timer rejecting outlier sample");
                    return;
                }
            }
        }
        accumulators.entry(key.to_string()).or_default().update(sample_ms);
    }

    /// `true` once `key` has accumulated enough samples for its
    /// recommendation to be trusted over a static configuration.
    pub fn is_warm(&self, key: &str) -> bool {
        self.accumulators.lock().get(key).map(|w| w.count as usize >= self.warmup_samples).unwrap_or(false)
    }

    pub fn stats(&self, key: &str) -> Option<AdaptiveStats> {
        self.accumulators.lock().get(key).map(|w| AdaptiveStats { samples: w.count, mean_ms: w.mean, stddev_ms: w.stddev() })
    }

    /// `multiplier × (mean + k·stddev)` for `key`, or `None` if no
    /// sample has been recorded yet.
    pub fn recommended(&self, key: &str) -> Option<Duration> {
        let accumulators = self.accumulators.lock();
        let welford = accumulators.get(key)?;
        if welford.count == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(self.recommend(welford) / 1000.0))
    }

    fn recommend(&self, welford: &Welford) -> f64 {
        self.multiplier * (welford.mean + K * welford.stddev())
    }
}

#[cfg(test)]
#[path = "adaptive_tests.rs"]
mod tests;
