//! Telemetry Recorder
//!
//! Ingests completion outcomes and closes the loop: a success commits the
//! governor reservation at the *actual* cost and feeds the health monitor a
//! success sample; a failure releases the reservation and feeds a failure
//! sample. Thin, but its correctness is load-bearing for both collaborators.
//!
//! Reports are idempotent on request id: retried telemetry calls for the
//! same id are a no-op, detected through a short-lived seen-set, so cost is
//! committed exactly once per request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::governor::CostGovernor;
use crate::health::HealthMonitor;

// ============================================================================
// Counters
// ============================================================================

/// A monotonically increasing atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a zeroed counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by one.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n`.
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Completion Reports
// ============================================================================

/// A completion outcome reported by the caller after the provider call.
#[derive(Clone, Debug)]
pub struct CompletionReport {
    /// The request this settles
    pub request_id: String,

    /// Whether the provider call succeeded
    pub success: bool,

    /// Actual cost in cents; may differ from the routed estimate
    pub actual_cost_cents: u64,

    /// Input tokens consumed
    pub input_tokens: u64,

    /// Output tokens produced
    pub output_tokens: u64,

    /// Observed end-to-end latency in milliseconds
    pub latency_ms: u64,
}

/// Counter snapshot for system stats.
#[derive(Clone, Debug, Default)]
pub struct TelemetryStats {
    /// Completions processed (deduplicated)
    pub completions: u64,

    /// Duplicate reports suppressed
    pub duplicates: u64,

    /// Failed completions processed
    pub failures: u64,

    /// Reports with no matching reservation
    pub unmatched: u64,

    /// Total input tokens across completions
    pub input_tokens: u64,

    /// Total output tokens across completions
    pub output_tokens: u64,
}

// ============================================================================
// Telemetry Recorder
// ============================================================================

/// Completion ingestion, idempotent per request id.
pub struct TelemetryRecorder {
    governor: Arc<CostGovernor>,
    health: Arc<HealthMonitor>,

    /// Recently settled request ids and when they were first seen
    seen: DashMap<String, Instant>,

    /// How long settled ids are remembered
    idempotency_ttl: Duration,

    completions: Counter,
    duplicates: Counter,
    failures: Counter,
    unmatched: Counter,
    input_tokens: Counter,
    output_tokens: Counter,
}

impl TelemetryRecorder {
    /// Create a recorder feeding the given governor and health monitor.
    #[must_use]
    pub fn new(
        governor: Arc<CostGovernor>,
        health: Arc<HealthMonitor>,
        idempotency_ttl: Duration,
    ) -> Self {
        Self {
            governor,
            health,
            seen: DashMap::new(),
            idempotency_ttl,
            completions: Counter::new(),
            duplicates: Counter::new(),
            failures: Counter::new(),
            unmatched: Counter::new(),
            input_tokens: Counter::new(),
            output_tokens: Counter::new(),
        }
    }

    /// Record one completion outcome. Duplicate request ids are a no-op.
    pub fn record_completion(&self, report: &CompletionReport) {
        // The insert is the dedup point: exactly one caller sees no prior
        // entry for a given id
        if self
            .seen
            .insert(report.request_id.clone(), Instant::now())
            .is_some()
        {
            self.duplicates.inc();
            tracing::debug!(
                request = %report.request_id,
                "duplicate completion report ignored"
            );
            return;
        }

        let reservation = if report.success {
            self.governor
                .commit(&report.request_id, report.actual_cost_cents)
        } else {
            self.failures.inc();
            self.governor.release(&report.request_id)
        };

        match reservation {
            Some(reservation) => {
                self.health.record_sample(
                    &reservation.provider_id,
                    report.latency_ms,
                    report.success,
                );
                self.completions.inc();
                self.input_tokens.add(report.input_tokens);
                self.output_tokens.add(report.output_tokens);
                tracing::debug!(
                    request = %report.request_id,
                    org = %reservation.org_id,
                    provider = %reservation.provider_id,
                    success = report.success,
                    actual_cents = report.actual_cost_cents,
                    "completion recorded"
                );
            }
            None => {
                // Reservation already settled or swept; nothing to feed back
                self.unmatched.inc();
                tracing::warn!(
                    request = %report.request_id,
                    "completion report matches no reservation"
                );
            }
        }
    }

    /// Drop seen-set entries older than the idempotency TTL.
    pub fn prune_expired(&self) -> usize {
        let before = self.seen.len();
        self.seen
            .retain(|_, seen_at| seen_at.elapsed() <= self.idempotency_ttl);
        before.saturating_sub(self.seen.len())
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            completions: self.completions.get(),
            duplicates: self.duplicates.get(),
            failures: self.failures.get(),
            unmatched: self.unmatched.get(),
            input_tokens: self.input_tokens.get(),
            output_tokens: self.output_tokens.get(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertSender;
    use crate::config::HealthConfig;
    use crate::governor::OrgLimits;

    fn recorder() -> (TelemetryRecorder, Arc<CostGovernor>, Arc<HealthMonitor>) {
        let governor = Arc::new(CostGovernor::new(
            OrgLimits::default(),
            AlertSender::disabled(),
        ));
        let health = Arc::new(HealthMonitor::new(HealthConfig::default()));
        let recorder = TelemetryRecorder::new(
            governor.clone(),
            health.clone(),
            Duration::from_secs(600),
        );
        (recorder, governor, health)
    }

    fn report(request_id: &str, success: bool, actual: u64) -> CompletionReport {
        CompletionReport {
            request_id: request_id.to_string(),
            success,
            actual_cost_cents: actual,
            input_tokens: 1000,
            output_tokens: 500,
            latency_ms: 250,
        }
    }

    #[test]
    fn test_success_commits_and_samples() {
        let (recorder, governor, health) = recorder();
        governor.admit("org-1", "req-1", "prov-a", 100).unwrap();

        recorder.record_completion(&report("req-1", true, 80));

        let usage = governor.usage("org-1").unwrap();
        assert_eq!(usage.spend_today_cents, 80);
        assert_eq!(usage.reserved_cents, 0);

        let snapshot = health.snapshot("prov-a").unwrap();
        assert_eq!(snapshot.sample_count, 1);
        assert!(snapshot.error_rate < 0.01);
    }

    #[test]
    fn test_failure_releases_and_samples() {
        let (recorder, governor, health) = recorder();
        governor.admit("org-1", "req-1", "prov-a", 100).unwrap();

        recorder.record_completion(&report("req-1", false, 0));

        let usage = governor.usage("org-1").unwrap();
        assert_eq!(usage.spend_today_cents, 0);
        assert_eq!(usage.reserved_cents, 0);
        assert!(health.snapshot("prov-a").unwrap().error_rate > 0.0);
        assert_eq!(recorder.stats().failures, 1);
    }

    #[test]
    fn test_duplicate_commits_exactly_once() {
        let (recorder, governor, _health) = recorder();
        governor.admit("org-1", "req-1", "prov-a", 100).unwrap();

        recorder.record_completion(&report("req-1", true, 100));
        recorder.record_completion(&report("req-1", true, 100));
        recorder.record_completion(&report("req-1", true, 100));

        assert_eq!(governor.usage("org-1").unwrap().spend_today_cents, 100);
        let stats = recorder.stats();
        assert_eq!(stats.completions, 1);
        assert_eq!(stats.duplicates, 2);
    }

    #[test]
    fn test_unknown_request_is_unmatched() {
        let (recorder, _governor, health) = recorder();
        recorder.record_completion(&report("ghost", true, 100));

        assert_eq!(recorder.stats().unmatched, 1);
        assert_eq!(recorder.stats().completions, 0);
        assert_eq!(health.provider_count(), 0);
    }

    #[test]
    fn test_prune_expired_respects_ttl() {
        let governor = Arc::new(CostGovernor::new(
            OrgLimits::default(),
            AlertSender::disabled(),
        ));
        let health = Arc::new(HealthMonitor::new(HealthConfig::default()));
        let recorder =
            TelemetryRecorder::new(governor.clone(), health, Duration::from_millis(10));

        governor.admit("org-1", "req-1", "p", 10).unwrap();
        recorder.record_completion(&report("req-1", true, 10));
        assert_eq!(recorder.prune_expired(), 0);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(recorder.prune_expired(), 1);

        // Past the TTL the same id commits again only if a reservation
        // exists; without one it is unmatched, never a double commit
        recorder.record_completion(&report("req-1", true, 10));
        assert_eq!(governor.usage("org-1").unwrap().spend_today_cents, 10);
        assert_eq!(recorder.stats().unmatched, 1);
    }

    #[test]
    fn test_token_counters_accumulate() {
        let (recorder, governor, _health) = recorder();
        governor.admit("org-1", "req-1", "p", 10).unwrap();
        governor.admit("org-1", "req-2", "p", 10).unwrap();

        recorder.record_completion(&report("req-1", true, 10));
        recorder.record_completion(&report("req-2", true, 10));

        let stats = recorder.stats();
        assert_eq!(stats.input_tokens, 2000);
        assert_eq!(stats.output_tokens, 1000);
    }
}
