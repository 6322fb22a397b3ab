//! Request metrics: rate, errors by kind, and latency.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Caller received a success reply.
    Success,
    /// Pid translation failed; nothing was sent downstream.
    MappingFailed,
    /// RealtimeKit returned an error.
    DownstreamFailed,
    /// RealtimeKit returned a malformed value.
    InvalidResponse,
    /// The request future was dropped before completing.
    Abandoned,
}

impl Outcome {
    const COUNT: usize = 5;

    const fn index(self) -> usize {
        match self {
            Self::Success => 0,
            Self::MappingFailed => 1,
            Self::DownstreamFailed => 2,
            Self::InvalidResponse => 3,
            Self::Abandoned => 4,
        }
    }
}

/// Forwarder metrics.
///
/// Cloning shares the counters, so every request can hold a handle.
#[derive(Debug, Clone)]
pub struct ForwarderMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug)]
struct Counters {
    received: AtomicU64,
    outcomes: [AtomicU64; Outcome::COUNT],
    // Microseconds
    latency_total_us: AtomicU64,
    latency_peak_us: AtomicU64,
    since: Instant,
}

impl ForwarderMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Counters {
                received: AtomicU64::new(0),
                outcomes: std::array::from_fn(|_| AtomicU64::new(0)),
                latency_total_us: AtomicU64::new(0),
                latency_peak_us: AtomicU64::new(0),
                since: Instant::now(),
            }),
        }
    }

    /// Counts a newly received request.
    pub fn record_request(&self) {
        self.inner.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records how a request ended and how long it took.
    pub fn record_outcome(&self, outcome: Outcome, latency: Duration) {
        self.inner.outcomes[outcome.index()].fetch_add(1, Ordering::Relaxed);

        let us = latency.as_micros() as u64;
        self.inner.latency_total_us.fetch_add(us, Ordering::Relaxed);
        self.inner.latency_peak_us.fetch_max(us, Ordering::Relaxed);
    }

    fn count(&self, outcome: Outcome) -> u64 {
        self.inner.outcomes[outcome.index()].load(Ordering::Relaxed)
    }

    fn finished(&self) -> u64 {
        self.inner
            .outcomes
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    /// Returns total requests received.
    #[must_use]
    pub fn requests_total(&self) -> u64 {
        self.inner.received.load(Ordering::Relaxed)
    }

    /// Returns total requests completed successfully.
    #[must_use]
    pub fn successes_total(&self) -> u64 {
        self.count(Outcome::Success)
    }

    /// Returns total failed pid translations.
    #[must_use]
    pub fn mapping_failures(&self) -> u64 {
        self.count(Outcome::MappingFailed)
    }

    /// Returns total errors relayed from RealtimeKit.
    #[must_use]
    pub fn downstream_failures(&self) -> u64 {
        self.count(Outcome::DownstreamFailed)
    }

    /// Returns total malformed property responses.
    #[must_use]
    pub fn invalid_responses(&self) -> u64 {
        self.count(Outcome::InvalidResponse)
    }

    /// Returns total requests dropped before completion.
    #[must_use]
    pub fn abandoned(&self) -> u64 {
        self.count(Outcome::Abandoned)
    }

    /// Returns all requests answered with an error.
    #[must_use]
    pub fn errors_total(&self) -> u64 {
        self.mapping_failures() + self.downstream_failures() + self.invalid_responses()
    }

    /// Returns requests that have not completed yet.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.requests_total().saturating_sub(self.finished())
    }

    /// Mean time from receipt to completion.
    #[must_use]
    pub fn latency_mean(&self) -> Duration {
        match self.finished() {
            0 => Duration::ZERO,
            n => Duration::from_micros(self.inner.latency_total_us.load(Ordering::Relaxed) / n),
        }
    }

    /// Slowest completion seen.
    #[must_use]
    pub fn latency_peak(&self) -> Duration {
        Duration::from_micros(self.inner.latency_peak_us.load(Ordering::Relaxed))
    }

    /// Returns time since the counters were created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.inner.since.elapsed()
    }

    /// Copies the current values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total(),
            successes_total: self.successes_total(),
            mapping_failures: self.mapping_failures(),
            downstream_failures: self.downstream_failures(),
            invalid_responses: self.invalid_responses(),
            abandoned: self.abandoned(),
            latency_mean_us: self.latency_mean().as_micros() as u64,
            latency_peak_us: self.latency_peak().as_micros() as u64,
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

impl Default for ForwarderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ForwarderMetrics`], logged at shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total requests received.
    pub requests_total: u64,
    /// Requests completed successfully.
    pub successes_total: u64,
    /// Failed pid translations.
    pub mapping_failures: u64,
    /// Errors relayed from RealtimeKit.
    pub downstream_failures: u64,
    /// Malformed property responses.
    pub invalid_responses: u64,
    /// Requests dropped before completion.
    pub abandoned: u64,
    /// Mean latency in microseconds.
    pub latency_mean_us: u64,
    /// Peak latency in microseconds.
    pub latency_peak_us: u64,
    /// Uptime in seconds.
    pub uptime_secs: u64,
}
