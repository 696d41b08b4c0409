//! Gateway Engine
//!
//! The facade wiring registry, health monitor, cost governor, routing
//! engine, sanitizer, and telemetry into one explicitly constructed
//! instance. There is no module-level singleton: handlers receive a shared
//! reference, tests build as many isolated engines as they need, and no
//! state leaks across tenants or test cases.
//!
//! ```text
//! route_request ──> classify ──> admit (reserve) ──> RoutingDecision
//!       │                                                 │
//!       │            process_request_content <────────────┘
//!       │                      │
//!       └── caller invokes provider (external) ──> record_request_completion
//!                                                        │
//!                                      commit/release + health sample
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::alerts::{AlertEvent, AlertSender};
use crate::config::EngineConfig;
use crate::governor::{CostGovernor, OrgLimitsUpdate, OrgUsageSnapshot};
use crate::health::{HealthMonitor, HealthSnapshot};
use crate::registry::{Provider, ProviderRegistry};
use crate::request::{AIRequest, HeuristicEstimator, TokenEstimator};
use crate::router::{EngineError, RoutingDecision, RoutingEngine};
use crate::sanitizer::{ContentSanitizer, SanitizedContent};
use crate::telemetry::{CompletionReport, TelemetryRecorder, TelemetryStats};

// ============================================================================
// System Stats
// ============================================================================

/// Aggregate view of the engine for dashboards and operators.
#[derive(Clone, Debug)]
pub struct SystemStats {
    /// Health snapshot per tracked provider
    pub providers: Vec<HealthSnapshot>,

    /// Committed daily spend across all orgs, in cents
    pub total_daily_cost_cents: u64,

    /// Committed monthly spend across all orgs, in cents
    pub total_monthly_cost_cents: u64,

    /// Orgs with usage state
    pub active_organizations: usize,

    /// Requests admitted in the current UTC day, across orgs
    pub requests_24h: u64,

    /// Mean EMA latency across providers, in milliseconds
    pub average_latency_ms: f64,

    /// Mean EMA error rate across providers
    pub error_rate: f64,

    /// Reservations currently held
    pub active_reservations: usize,

    /// Telemetry counters
    pub telemetry: TelemetryStats,
}

// ============================================================================
// Gateway Engine
// ============================================================================

/// The AI request router and cost governance engine.
pub struct GatewayEngine {
    config: EngineConfig,
    registry: Arc<ProviderRegistry>,
    health: Arc<HealthMonitor>,
    governor: Arc<CostGovernor>,
    sanitizer: ContentSanitizer,
    router: RoutingEngine,
    telemetry: TelemetryRecorder,
}

impl GatewayEngine {
    /// Create an engine with alerting disabled and the default token
    /// estimator.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_options(config, None, Arc::new(HeuristicEstimator::default()))
    }

    /// Create an engine delivering governor alerts into `alerts_tx`.
    ///
    /// Size the channel from `config.alerts.channel_capacity`; overflow is
    /// shed, never blocking admission.
    #[must_use]
    pub fn with_alerts(config: EngineConfig, alerts_tx: mpsc::Sender<AlertEvent>) -> Self {
        Self::with_options(
            config,
            Some(alerts_tx),
            Arc::new(HeuristicEstimator::default()),
        )
    }

    /// Create an engine with explicit alerting and token estimation.
    #[must_use]
    pub fn with_options(
        config: EngineConfig,
        alerts_tx: Option<mpsc::Sender<AlertEvent>>,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Self {
        let alerts = alerts_tx.map_or_else(AlertSender::disabled, AlertSender::new);

        let registry = Arc::new(ProviderRegistry::new());
        let health = Arc::new(HealthMonitor::new(config.health));
        let governor = Arc::new(CostGovernor::new(
            config.governor.default_limits,
            alerts,
        ));
        let router = RoutingEngine::new(
            registry.clone(),
            health.clone(),
            governor.clone(),
            config.routing,
            estimator,
        );
        let telemetry = TelemetryRecorder::new(
            governor.clone(),
            health.clone(),
            Duration::from_millis(config.telemetry.idempotency_ttl_ms),
        );

        Self {
            config,
            registry,
            health,
            governor,
            sanitizer: ContentSanitizer::new(),
            router,
            telemetry,
        }
    }

    // ── Catalog management ─────────────────────────────────────────────

    /// Register or replace a provider; atomic with respect to routing.
    pub fn register_provider(&self, provider: Provider) {
        self.registry.register(provider);
    }

    /// Remove a provider from the catalog.
    pub fn deregister_provider(&self, provider_id: &str) -> bool {
        self.registry.deregister(provider_id)
    }

    // ── Request lifecycle ──────────────────────────────────────────────

    /// Route a request; on success the governor holds one reservation for
    /// it until completion is reported or the sweep reclaims it.
    ///
    /// # Errors
    ///
    /// See [`EngineError`] — `NoRouteAvailable` is structural,
    /// `BudgetExceeded` is retryable after headroom returns,
    /// `InvalidRequest` is a caller bug.
    pub fn route_request(&self, request: &AIRequest) -> Result<RoutingDecision, EngineError> {
        self.router.route(request)
    }

    /// Sanitize content for its routed destination. Runs after routing
    /// because the redaction policy depends on where the content is going.
    #[must_use]
    pub fn process_request_content(
        &self,
        content: &str,
        decision: &RoutingDecision,
        request: &AIRequest,
    ) -> SanitizedContent {
        self.sanitizer.process(content, decision, request)
    }

    /// Report the completion outcome for a routed request. Idempotent per
    /// request id.
    pub fn record_request_completion(&self, report: &CompletionReport) {
        self.telemetry.record_completion(report);
    }

    // ── Operator surface ───────────────────────────────────────────────

    /// Usage snapshot for an org, `None` if it never made a request.
    #[must_use]
    pub fn organization_usage(&self, org_id: &str) -> Option<OrgUsageSnapshot> {
        self.governor.usage(org_id)
    }

    /// Merge a partial limits update; effective for future admissions only.
    pub fn update_organization_limits(&self, org_id: &str, update: OrgLimitsUpdate) {
        self.governor.update_limits(org_id, update);
    }

    /// Lift an org's emergency stop; the operator action is logged.
    pub fn clear_emergency_stop(&self, org_id: &str, operator: &str) -> bool {
        self.governor.clear_emergency_stop(org_id, operator)
    }

    /// Aggregate stats across providers, orgs, and telemetry.
    #[must_use]
    pub fn system_stats(&self) -> SystemStats {
        let totals = self.governor.totals();
        SystemStats {
            providers: self.health.all_snapshots(),
            total_daily_cost_cents: totals.total_daily_cents,
            total_monthly_cost_cents: totals.total_monthly_cents,
            active_organizations: totals.active_organizations,
            requests_24h: totals.requests_24h,
            average_latency_ms: self.health.average_latency_ms(),
            error_rate: self.health.average_error_rate(),
            active_reservations: self.governor.active_reservations(),
            telemetry: self.telemetry.stats(),
        }
    }

    // ── Maintenance ────────────────────────────────────────────────────

    /// Spawn the background maintenance loop: reservation sweep and
    /// idempotency-set pruning on the configured interval. Abort the handle
    /// on shutdown.
    pub fn spawn_maintenance(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        let sweep_interval = Duration::from_millis(engine.config.governor.sweep_interval_ms);
        let max_age = Duration::from_millis(engine.config.governor.reservation_max_age_ms);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let swept = engine.governor.sweep_expired_reservations(max_age);
                let pruned = engine.telemetry.prune_expired();
                if swept > 0 || pruned > 0 {
                    tracing::debug!(swept, pruned, "maintenance pass");
                }
            }
        })
    }

    // ── Component access ───────────────────────────────────────────────

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The provider registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// The health monitor.
    #[must_use]
    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    /// The cost governor.
    #[must_use]
    pub fn governor(&self) -> &Arc<CostGovernor> {
        &self.governor
    }
}

// ============================================================================
// Tests
// ============================================================================
