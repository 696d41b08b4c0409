//! Provider Health Scoring
//!
//! Tracks a rolling picture of provider behavior from completion samples:
//! exponentially-weighted latency and error rate, per provider, lock-free.
//! Routing reads a best-effort snapshot of scores — sample ingestion never
//! blocks a routing read, and a score may trail reality by up to one
//! monitoring interval.
//!
//! A provider that stops reporting decays toward a neutral score of 0.5 once
//! its newest sample ages past the staleness window, so neither a stale
//! "perfect" history nor a stale bad one dominates routing forever.
//!
//! # Thread Safety
//!
//! All per-provider state is atomics; the tracker itself is a `DashMap`.
//! Error rate is stored fixed-point (value × 10000) to stay CAS-friendly.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::HealthConfig;

// ============================================================================
// Per-Provider Health
// ============================================================================

/// Rolling health state for a single provider.
pub struct ProviderHealth {
    /// Provider identifier
    pub provider_id: String,

    config: HealthConfig,

    /// EMA latency in milliseconds
    avg_latency_ms: AtomicU64,

    /// EMA error rate, fixed-point (rate × 10000)
    error_rate_fp: AtomicU32,

    /// Total samples ingested
    sample_count: AtomicU64,

    /// Newest sample time (millis since `startup_time`, 0 = never)
    last_sample_ts: AtomicU64,

    /// Baseline for timestamp arithmetic
    startup_time: Instant,
}

impl ProviderHealth {
    /// Create health state for a provider.
    pub fn new(provider_id: impl Into<String>, config: HealthConfig) -> Self {
        Self {
            provider_id: provider_id.into(),
            avg_latency_ms: AtomicU64::new(config.target_latency_ms),
            config,
            error_rate_fp: AtomicU32::new(0),
            sample_count: AtomicU64::new(0),
            last_sample_ts: AtomicU64::new(0),
            startup_time: Instant::now(),
        }
    }

    /// Ingest one completion sample.
    pub fn record_sample(&self, latency_ms: u64, success: bool) {
        self.sample_count.fetch_add(1, Ordering::Relaxed);
        self.last_sample_ts.store(self.now_millis(), Ordering::Release);

        self.update_latency(latency_ms);
        self.update_error_rate(!success);
    }

    /// EMA update of the average latency.
    fn update_latency(&self, latency_ms: u64) {
        let alpha = self.config.ema_alpha;
        loop {
            let current = self.avg_latency_ms.load(Ordering::Acquire);
            let next = (alpha * latency_ms as f64 + (1.0 - alpha) * current as f64) as u64;
            if self
                .avg_latency_ms
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
    }

    /// EMA update of the error rate.
    fn update_error_rate(&self, is_failure: bool) {
        let alpha = self.config.ema_alpha;
        let sample = if is_failure { 1.0 } else { 0.0 };
        loop {
            let current_fp = self.error_rate_fp.load(Ordering::Acquire);
            let current = f64::from(current_fp) / 10000.0;
            let next_fp = ((alpha * sample + (1.0 - alpha) * current) * 10000.0) as u32;
            if self
                .error_rate_fp
                .compare_exchange(current_fp, next_fp, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }
    }

    /// Current EMA error rate (0.0 – 1.0).
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        f64::from(self.error_rate_fp.load(Ordering::Acquire)) / 10000.0
    }

    /// Current EMA latency in milliseconds.
    #[must_use]
    pub fn avg_latency_ms(&self) -> u64 {
        self.avg_latency_ms.load(Ordering::Acquire)
    }

    /// Total samples ingested.
    #[must_use]
    pub fn sample_count(&self) -> u64 {
        self.sample_count.load(Ordering::Relaxed)
    }

    /// Age of the newest sample, `None` if no sample ever arrived.
    #[must_use]
    pub fn sample_age(&self) -> Option<Duration> {
        let ts = self.last_sample_ts.load(Ordering::Acquire);
        if ts == 0 {
            return None;
        }
        Some(Duration::from_millis(self.now_millis().saturating_sub(ts)))
    }

    /// Composite health score in `[0, 1]`.
    ///
    /// Lower error rate and lower latency both raise the score. Past the
    /// staleness window the score blends linearly toward 0.5, reaching fully
    /// neutral at twice the window. A provider with no samples scores
    /// exactly 0.5.
    #[must_use]
    pub fn score(&self) -> f64 {
        let Some(age) = self.sample_age() else {
            return 0.5;
        };

        let target = self.config.target_latency_ms as f64;
        let latency_component = target / (target + self.avg_latency_ms() as f64);
        let raw = (1.0 - self.error_rate()) * 0.6 + latency_component * 0.4;

        let window = Duration::from_millis(self.config.staleness_window_ms);
        if age <= window {
            return raw;
        }
        let staleness =
            ((age.as_millis() - window.as_millis()) as f64 / window.as_millis() as f64).min(1.0);
        raw + (0.5 - raw) * staleness
    }

    /// Millis since startup, at least 1 so 0 stays a "never" sentinel.
    fn now_millis(&self) -> u64 {
        self.startup_time.elapsed().as_millis() as u64 + 1
    }

    /// Freeze the current state into a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            provider_id: self.provider_id.clone(),
            score: self.score(),
            avg_latency_ms: self.avg_latency_ms(),
            error_rate: self.error_rate(),
            sample_count: self.sample_count(),
            last_updated: self.sample_age(),
        }
    }
}

impl std::fmt::Debug for ProviderHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHealth")
            .field("provider_id", &self.provider_id)
            .field("score", &self.score())
            .field("avg_latency_ms", &self.avg_latency_ms())
            .field("error_rate", &self.error_rate())
            .field("sample_count", &self.sample_count())
            .finish()
    }
}

/// Immutable view of one provider's health at a point in time.
#[derive(Clone, Debug)]
pub struct HealthSnapshot {
    /// Provider identifier
    pub provider_id: String,

    /// Composite score in `[0, 1]`
    pub score: f64,

    /// EMA latency in milliseconds
    pub avg_latency_ms: u64,

    /// EMA error rate (0.0 – 1.0)
    pub error_rate: f64,

    /// Total samples ingested
    pub sample_count: u64,

    /// Age of the newest sample, `None` if none arrived yet
    pub last_updated: Option<Duration>,
}

// ============================================================================
// Health Monitor
// ============================================================================

/// Aggregate health tracker across all providers.
pub struct HealthMonitor {
    providers: DashMap<String, Arc<ProviderHealth>>,
    config: HealthConfig,
}

impl HealthMonitor {
    /// Create a monitor with the given configuration.
    #[must_use]
    pub fn new(config: HealthConfig) -> Self {
        Self {
            providers: DashMap::new(),
            config,
        }
    }

    /// Ingest one sample for a provider, creating its state lazily.
    pub fn record_sample(&self, provider_id: &str, latency_ms: u64, success: bool) {
        let health = self
            .providers
            .entry(provider_id.to_string())
            .or_insert_with(|| Arc::new(ProviderHealth::new(provider_id, self.config)))
            .clone();
        health.record_sample(latency_ms, success);
    }

    /// Composite score for a provider; 0.5 (neutral) when unknown.
    #[must_use]
    pub fn score(&self, provider_id: &str) -> f64 {
        self.providers
            .get(provider_id)
            .map_or(0.5, |h| h.score())
    }

    /// EMA latency for a provider; the configured target when unknown.
    #[must_use]
    pub fn avg_latency_ms(&self, provider_id: &str) -> u64 {
        self.providers
            .get(provider_id)
            .map_or(self.config.target_latency_ms, |h| h.avg_latency_ms())
    }

    /// Snapshot of one provider, if tracked.
    #[must_use]
    pub fn snapshot(&self, provider_id: &str) -> Option<HealthSnapshot> {
        self.providers.get(provider_id).map(|h| h.snapshot())
    }

    /// Snapshots of every tracked provider.
    #[must_use]
    pub fn all_snapshots(&self) -> Vec<HealthSnapshot> {
        self.providers.iter().map(|e| e.value().snapshot()).collect()
    }

    /// Mean EMA latency across tracked providers, 0 when none.
    #[must_use]
    pub fn average_latency_ms(&self) -> f64 {
        let snapshots = self.all_snapshots();
        if snapshots.is_empty() {
            return 0.0;
        }
        snapshots.iter().map(|s| s.avg_latency_ms as f64).sum::<f64>() / snapshots.len() as f64
    }

    /// Mean EMA error rate across tracked providers, 0 when none.
    #[must_use]
    pub fn average_error_rate(&self) -> f64 {
        let snapshots = self.all_snapshots();
        if snapshots.is_empty() {
            return 0.0;
        }
        snapshots.iter().map(|s| s.error_rate).sum::<f64>() / snapshots.len() as f64
    }

    /// Number of tracked providers.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> HealthConfig {
        HealthConfig {
            ema_alpha: 0.3,
            health_check_interval_ms: 30_000,
            staleness_window_ms: 90_000,
            target_latency_ms: 1000,
        }
    }

    #[test]
    fn test_unknown_provider_is_neutral() {
        let monitor = HealthMonitor::new(test_config());
        assert!((monitor.score("nobody") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_samples_is_neutral() {
        let health = ProviderHealth::new("p", test_config());
        assert!((health.score() - 0.5).abs() < f64::EPSILON);
        assert!(health.sample_age().is_none());
    }

    #[test]
    fn test_successes_raise_score_above_neutral() {
        let health = ProviderHealth::new("p", test_config());
        for _ in 0..10 {
            health.record_sample(200, true);
        }
        assert!(health.score() > 0.5, "got {}", health.score());
        assert!(health.error_rate() < 0.01);
    }

    #[test]
    fn test_failures_lower_score() {
        let health = ProviderHealth::new("p", test_config());
        for _ in 0..10 {
            health.record_sample(200, true);
        }
        let healthy_score = health.score();

        for _ in 0..5 {
            health.record_sample(200, false);
        }
        assert!(health.score() < healthy_score);
        assert!(health.error_rate() > 0.5);
    }

    #[test]
    fn test_latency_component() {
        let fast = ProviderHealth::new("fast", test_config());
        let slow = ProviderHealth::new("slow", test_config());
        for _ in 0..20 {
            fast.record_sample(100, true);
            slow.record_sample(5000, true);
        }
        assert!(fast.score() > slow.score());
    }

    #[test]
    fn test_staleness_decays_toward_neutral() {
        let config = HealthConfig {
            staleness_window_ms: 10,
            ..test_config()
        };
        let health = ProviderHealth::new("p", config);
        for _ in 0..10 {
            health.record_sample(100, true);
        }
        let fresh = health.score();
        assert!(fresh > 0.8);

        // Newest sample ages past 2x the window -> fully neutral
        std::thread::sleep(Duration::from_millis(30));
        let stale = health.score();
        assert!(stale < fresh);
        assert!((stale - 0.5).abs() < 0.05, "got {stale}");
    }

    #[test]
    fn test_stale_failures_also_decay_up() {
        let config = HealthConfig {
            staleness_window_ms: 10,
            ..test_config()
        };
        let health = ProviderHealth::new("p", config);
        for _ in 0..10 {
            health.record_sample(100, false);
        }
        let fresh = health.score();
        assert!(fresh < 0.5);

        std::thread::sleep(Duration::from_millis(30));
        assert!(health.score() > fresh);
    }

    #[test]
    fn test_monitor_lazy_creation_and_snapshots() {
        let monitor = HealthMonitor::new(test_config());
        monitor.record_sample("a", 100, true);
        monitor.record_sample("b", 100, false);

        assert_eq!(monitor.provider_count(), 2);
        let snapshot = monitor.snapshot("a").unwrap();
        assert_eq!(snapshot.sample_count, 1);
        assert!(snapshot.last_updated.is_some());
        assert_eq!(monitor.all_snapshots().len(), 2);
    }

    #[test]
    fn test_monitor_aggregates() {
        let monitor = HealthMonitor::new(test_config());
        assert!(monitor.average_latency_ms().abs() < f64::EPSILON);

        for _ in 0..50 {
            monitor.record_sample("a", 100, true);
            monitor.record_sample("b", 300, true);
        }
        let avg = monitor.average_latency_ms();
        assert!(avg > 100.0 && avg < 300.0);
    }

    #[test]
    fn test_concurrent_samples() {
        let health = Arc::new(ProviderHealth::new("p", test_config()));
        let mut handles = vec![];
        for i in 0..8 {
            let h = health.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    h.record_sample(100, i % 2 == 0);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(health.sample_count(), 1600);
        let rate = health.error_rate();
        assert!((0.0..=1.0).contains(&rate));
    }
}
