//! Process-wide request counters.
//!
//! Fire-and-forget aggregate updated by the observability middleware and
//! read by the admin performance endpoints. Counters are independent
//! atomics, so a snapshot taken under load may be off by in-flight requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Requests slower than this are logged at warn.
pub const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct PerformanceStats {
    request_count: AtomicU64,
    success_count: AtomicU64,
    error_count: AtomicU64,
    total_latency_micros: AtomicU64,
    max_latency_micros: AtomicU64,
    min_latency_micros: AtomicU64,
}

impl Default for PerformanceStats {
    fn default() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            total_latency_micros: AtomicU64::new(0),
            max_latency_micros: AtomicU64::new(0),
            min_latency_micros: AtomicU64::new(u64::MAX),
        }
    }
}

/// Serializable view of [`PerformanceStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    pub request_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub average_latency_ms: f64,
    pub max_latency_ms: f64,
    pub min_latency_ms: f64,
}

impl PerformanceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished request. Statuses of 400 and above are errors.
    pub fn record(&self, status: u16, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);

        self.request_count.fetch_add(1, Ordering::Relaxed);
        if status >= 400 {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_micros
            .fetch_add(micros, Ordering::Relaxed);
        self.max_latency_micros.fetch_max(micros, Ordering::Relaxed);
        self.min_latency_micros.fetch_min(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let request_count = self.request_count.load(Ordering::Relaxed);
        let total = self.total_latency_micros.load(Ordering::Relaxed);
        let min = self.min_latency_micros.load(Ordering::Relaxed);

        let average_latency_ms = if request_count == 0 {
            0.0
        } else {
            micros_to_ms(total) / request_count as f64
        };

        PerformanceSnapshot {
            request_count,
            success_count: self.success_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            average_latency_ms,
            max_latency_ms: micros_to_ms(self.max_latency_micros.load(Ordering::Relaxed)),
            min_latency_ms: if min == u64::MAX { 0.0 } else { micros_to_ms(min) },
        }
    }

    pub fn reset(&self) {
        self.request_count.store(0, Ordering::Relaxed);
        self.success_count.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
        self.total_latency_micros.store(0, Ordering::Relaxed);
        self.max_latency_micros.store(0, Ordering::Relaxed);
        self.min_latency_micros.store(u64::MAX, Ordering::Relaxed);
    }
}

fn micros_to_ms(micros: u64) -> f64 {
    micros as f64 / 1000.0
}
