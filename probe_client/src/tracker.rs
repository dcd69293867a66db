//! Latency Tracker Module
//!
//! Login round-trip timing and quote arrival statistics.
//! Uses HdrHistogram for the gaps between consecutive quotes.

use hdrhistogram::Histogram;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Highest trackable quote gap: one hour in microseconds.
const MAX_GAP_US: u64 = 3_600_000_000;

/// Time source for latency measurement
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same reading.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = match self.now.lock() {
            Ok(now) => now,
            Err(poisoned) => poisoned.into_inner(),
        };
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Login request timestamp. Written when the request goes out, consumed by the response.
#[derive(Debug, Default)]
pub struct LoginTimer {
    requested_at: Option<Instant>,
}

impl LoginTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record when the login request was sent
    pub fn record_request(&mut self, at: Instant) {
        if self.requested_at.replace(at).is_some() {
            log::warn!("Login request timestamp overwritten before a response arrived");
        }
    }

    /// Consume the request timestamp and return the elapsed time, if one was recorded
    pub fn record_response(&mut self, at: Instant) -> Option<Duration> {
        self.requested_at
            .take()
            .map(|sent| at.saturating_duration_since(sent))
    }
}

/// Quote arrival summary
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    pub count: u64,
    pub per_instrument: BTreeMap<String, u64>,
    pub gap_p50_us: u64,
    pub gap_p99_us: u64,
    pub gap_max_us: u64,
}

/// Counts quotes per instrument and records the gap between consecutive quotes
pub struct TickStats {
    histogram: Histogram<u64>,
    per_instrument: BTreeMap<String, u64>,
    last_tick: Option<Instant>,
    count: u64,
}

impl TickStats {
    /// Histogram is configured with:
    /// - Minimum value: 1 microsecond
    /// - Maximum value: 1 hour
    /// - 3 significant figures precision
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new_with_bounds(1, MAX_GAP_US, 3)
                .expect("Failed to create histogram"),
            per_instrument: BTreeMap::new(),
            last_tick: None,
            count: 0,
        }
    }

    pub fn record(&mut self, instrument_id: &str, at: Instant) {
        if let Some(prev) = self.last_tick {
            let gap = at.saturating_duration_since(prev).as_micros() as u64;
            if let Err(e) = self.histogram.record(gap.clamp(1, MAX_GAP_US)) {
                log::warn!("Failed to record quote gap {}: {}", gap, e);
            }
        }
        self.last_tick = Some(at);
        self.count += 1;
        *self.per_instrument.entry(instrument_id.to_string()).or_default() += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn summary(&self) -> TickSummary {
        TickSummary {
            count: self.count,
            per_instrument: self.per_instrument.clone(),
            gap_p50_us: self.histogram.value_at_quantile(0.50),
            gap_p99_us: self.histogram.value_at_quantile(0.99),
            gap_max_us: self.histogram.max(),
        }
    }

    pub fn log_summary(&self) {
        let s = self.summary();
        log::info!(
            "Received {} quotes, gap (us): p50={}, p99={}, max={}",
            s.count, s.gap_p50_us, s.gap_p99_us, s.gap_max_us
        );
        for (instrument, n) in &s.per_instrument {
            log::info!("  {}: {}", instrument, n);
        }
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}
