use crate::chain::ChainProvider;
use crate::config::AppConfig;
use crate::report::PnlReport;
use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;
use std::sync::Arc;

// ── Lock-free counters ──

pub struct PerfCounters {
    pub requests_served: AtomicU64,
    pub requests_failed: AtomicU64,
    pub rows_computed: AtomicU64,
    pub cells_unavailable: AtomicU64,
}

/// Point-in-time read of `PerfCounters`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub requests_served: u64,
    pub requests_failed: u64,
    pub rows_computed: u64,
    pub cells_unavailable: u64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            requests_served: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            rows_computed: AtomicU64::new(0),
            cells_unavailable: AtomicU64::new(0),
        }
    }

    pub fn record_report(&self, report: &PnlReport) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
        self.rows_computed
            .fetch_add(report.strategies.len() as u64, Ordering::Relaxed);
        self.cells_unavailable
            .fetch_add(report.unavailable_count() as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            requests_served: self.requests_served.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            rows_computed: self.rows_computed.load(Ordering::Relaxed),
            cells_unavailable: self.cells_unavailable.load(Ordering::Relaxed),
        }
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

// ── Application shared state ──

/// Read-only after startup apart from the counters. Requests share nothing else.
pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<dyn ChainProvider>,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Arc<dyn ChainProvider>) -> Arc<Self> {
        Arc::new(Self {
            config,
            provider,
            counters: PerfCounters::new(),
        })
    }
}
