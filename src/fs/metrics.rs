//! Metrics collection for backend queries.
//!
//! [`Instrumented`] wraps any adapter and records every `exists`/`glob`
//! round-trip, which makes backend traffic visible both to the CLI's
//! `--stats` output and to tests asserting how often the backend was hit.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::FilesystemAdapter;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Exists,
    Glob,
}

/// One completed backend call
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub operation: Operation,
    /// Path or pattern queried
    pub target: String,
    pub duration: Duration,
    pub succeeded: bool,
}

/// Thread-safe counters for backend calls
#[derive(Debug, Default)]
pub struct BackendMetrics {
    exists_calls: AtomicUsize,
    glob_calls: AtomicUsize,
    /// Total time spent in backend calls (nanoseconds)
    total_time_ns: AtomicU64,
    calls: RwLock<Vec<CallRecord>>,
}

impl BackendMetrics {
    /// Create a new metrics collector wrapped in Arc for sharing
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, operation: Operation, target: &str, duration: Duration, succeeded: bool) {
        match operation {
            Operation::Exists => self.exists_calls.fetch_add(1, Ordering::Relaxed),
            Operation::Glob => self.glob_calls.fetch_add(1, Ordering::Relaxed),
        };
        self.total_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);

        if let Ok(mut calls) = self.calls.write() {
            calls.push(CallRecord {
                operation,
                target: target.to_string(),
                duration,
                succeeded,
            });
        }
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::Relaxed)
    }

    pub fn glob_calls(&self) -> usize {
        self.glob_calls.load(Ordering::Relaxed)
    }

    /// Total number of backend round-trips
    pub fn total_calls(&self) -> usize {
        self.exists_calls() + self.glob_calls()
    }

    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.total_time_ns.load(Ordering::Relaxed))
    }

    /// Get all individual call records
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.exists_calls.store(0, Ordering::Relaxed);
        self.glob_calls.store(0, Ordering::Relaxed);
        self.total_time_ns.store(0, Ordering::Relaxed);
        if let Ok(mut calls) = self.calls.write() {
            calls.clear();
        }
    }
}

/// Adapter wrapper recording every call into [`BackendMetrics`]
pub struct Instrumented<A> {
    inner: A,
    metrics: Arc<BackendMetrics>,
}

impl<A: FilesystemAdapter> Instrumented<A> {
    pub fn new(inner: A) -> Self {
        Self::with_metrics(inner, BackendMetrics::new())
    }

    pub fn with_metrics(inner: A, metrics: Arc<BackendMetrics>) -> Self {
        Instrumented { inner, metrics }
    }

    pub fn metrics(&self) -> &Arc<BackendMetrics> {
        &self.metrics
    }
}

#[async_trait]
impl<A: FilesystemAdapter> FilesystemAdapter for Instrumented<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let start = Instant::now();
        let result = self.inner.exists(path).await;
        self.metrics
            .record(Operation::Exists, path, start.elapsed(), result.is_ok());
        tracing::debug!(backend = self.inner.name(), path, ?result, "exists");
        result
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let start = Instant::now();
        let result = self.inner.glob(pattern).await;
        self.metrics
            .record(Operation::Glob, pattern, start.elapsed(), result.is_ok());
        tracing::debug!(
            backend = self.inner.name(),
            pattern,
            matches = result.as_ref().map(Vec::len).unwrap_or(0),
            "glob"
        );
        result
    }
}
