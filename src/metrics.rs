//! Conversion metrics: atomic counters, an in-flight gauge, and a cumulative
//! duration histogram with a Prometheus text-exposition renderer.
//!
//! Every field is an independent atomic, so writers never block each other
//! and scrapes never block writers. A scrape takes an independent load of
//! each field; cross-field snapshots are not transactional, which is
//! acceptable for observational data.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Upper bounds (milliseconds) for the conversion duration histogram.
pub const DURATION_BUCKETS_MS: [u64; 8] = [100, 250, 500, 1000, 2500, 5000, 10000, 30000];

/// Content type for the text exposition format, version 0.0.4.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Duration distribution over fixed millisecond buckets.
///
/// Buckets are cumulative at write time: an observation increments every
/// bucket whose threshold is at or above the observed value, so the count at
/// a larger threshold can never fall below the count at a smaller one.
#[derive(Debug)]
struct Histogram {
    buckets: [AtomicU64; DURATION_BUCKETS_MS.len()],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        for (bucket, le) in self.buckets.iter().zip(DURATION_BUCKETS_MS) {
            if ms <= le {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Registry of all conversion metrics for the process.
///
/// Created once at startup and shared through [`crate::state::AppState`];
/// safe for any number of concurrent readers and writers.
#[derive(Debug)]
pub struct Registry {
    success: AtomicU64,
    timeout: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicI64,
    duration_ms: Histogram,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            success: AtomicU64::new(0),
            timeout: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            in_flight: AtomicI64::new(0),
            duration_ms: Histogram::new(),
        }
    }

    /// Increment the successful conversion counter.
    pub fn inc_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the timed-out conversion counter.
    pub fn inc_timeout(&self) {
        self.timeout.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the failed conversion counter.
    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the in-flight conversion gauge.
    pub fn inc_in_flight(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement the in-flight conversion gauge. Pairing with
    /// [`Registry::inc_in_flight`] is the caller's responsibility.
    pub fn dec_in_flight(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record one conversion duration in milliseconds.
    ///
    /// Values above the largest bucket are captured only by the implicit
    /// `+Inf` bucket (the observation count).
    pub fn observe_duration(&self, ms: u64) {
        self.duration_ms.observe(ms);
    }

    /// Render a plain-text snapshot in the Prometheus exposition format,
    /// version 0.0.4.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(1024);

        let _ = writeln!(
            out,
            "# HELP docpdf_conversions_total Total conversion attempts by outcome."
        );
        let _ = writeln!(out, "# TYPE docpdf_conversions_total counter");
        let _ = writeln!(
            out,
            "docpdf_conversions_total{{outcome=\"success\"}} {}",
            self.success.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "docpdf_conversions_total{{outcome=\"timeout\"}} {}",
            self.timeout.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "docpdf_conversions_total{{outcome=\"failed\"}} {}",
            self.failed.load(Ordering::Relaxed)
        );

        let _ = writeln!(
            out,
            "# HELP docpdf_conversions_in_flight Current number of conversions in progress."
        );
        let _ = writeln!(out, "# TYPE docpdf_conversions_in_flight gauge");
        let _ = writeln!(
            out,
            "docpdf_conversions_in_flight {}",
            self.in_flight.load(Ordering::Relaxed)
        );

        let _ = writeln!(
            out,
            "# HELP docpdf_conversion_duration_ms Conversion duration in milliseconds."
        );
        let _ = writeln!(out, "# TYPE docpdf_conversion_duration_ms histogram");
        // Bucket counts are cumulative by construction, so they render directly.
        for (bucket, le) in self.duration_ms.buckets.iter().zip(DURATION_BUCKETS_MS) {
            let _ = writeln!(
                out,
                "docpdf_conversion_duration_ms_bucket{{le=\"{le}\"}} {}",
                bucket.load(Ordering::Relaxed)
            );
        }
        let _ = writeln!(
            out,
            "docpdf_conversion_duration_ms_bucket{{le=\"+Inf\"}} {}",
            self.duration_ms.count.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "docpdf_conversion_duration_ms_sum {}",
            self.duration_ms.sum.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "docpdf_conversion_duration_ms_count {}",
            self.duration_ms.count.load(Ordering::Relaxed)
        );

        out
    }
}
