//! Routing Engine
//!
//! The decision core: given a classified request, the provider catalog,
//! health scores, and governor state, produce an ordered routing decision.
//!
//! # Decision Flow
//!
//! ```text
//! 1. Validate and classify the request (capabilities, token estimate)
//! 2. Candidate set from the registry; apply model override if any
//! 3. Rank: edge partition (sensitivity/preference), then composite score
//! 4. Cost-filter against the request's own ceiling
//! 5. Admit in rank order — first grant wins and holds the reservation
//! 6. Next ranked candidates become the fallback chain
//! ```
//!
//! Routing never falls back silently to a default provider: every failure
//! surfaces as a typed error so callers must branch on the outcome. Given
//! identical registry, health, and governor snapshots, `route` is a pure
//! function of the request.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RoutingConfig;
use crate::governor::{CostGovernor, RejectionReason};
use crate::health::HealthMonitor;
use crate::registry::{Candidate, ProviderRegistry, Region};
use crate::request::{AIRequest, InvalidRequest, TokenEstimator};

// Composite score weights. High/critical priority swaps the cost and
// latency weights so latency outranks cost for those requests.
const HEALTH_WEIGHT: f64 = 0.4;
const COST_WEIGHT: f64 = 0.3;
const LATENCY_WEIGHT: f64 = 0.2;

// ============================================================================
// Decision Types
// ============================================================================

/// A provider×model pair referenced from a decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderModelRef {
    /// Provider id
    pub provider_id: String,
    /// Model id
    pub model_id: String,
}

/// The outcome of routing one request. Immutable once returned; a new
/// request yields a new decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// The routed request
    pub request_id: String,

    /// Owning organization
    pub org_id: String,

    /// Chosen provider
    pub provider_id: String,

    /// Chosen model
    pub model_id: String,

    /// Region of the chosen provider
    pub region: Region,

    /// Reserved cost estimate in cents
    pub estimated_cost_cents: u64,

    /// The same estimate in EUR
    pub estimated_cost_eur: Decimal,

    /// Human-readable trace of the decisive factor
    pub routing_reason: String,

    /// Ordered alternates a caller may retry; advisory, not reserved
    pub fallback_chain: Vec<ProviderModelRef>,

    /// Whether the sanitizer will redact content for this destination
    pub redaction_required: bool,
}

/// Routing and governance failures surfaced to callers.
#[derive(Clone, Debug, Error)]
pub enum EngineError {
    /// No provider satisfies the required capabilities or model override.
    /// Structural — not retryable without changing the request.
    #[error("no route available: {0}")]
    NoRouteAvailable(String),

    /// Capability matches exist but every admissible candidate is over
    /// budget, or the org is emergency-stopped. Retryable once headroom
    /// returns.
    #[error("budget exceeded for organization {org_id}: {reason}")]
    BudgetExceeded {
        /// The organization whose budget blocked the request
        org_id: String,
        /// The decisive rejection
        reason: RejectionReason,
    },

    /// Malformed request. Caller bug, not retryable.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),
}

// ============================================================================
// Cost Estimation
// ============================================================================

/// Round an EUR amount up to whole cents.
pub(crate) fn eur_to_cents_ceil(eur: Decimal) -> u64 {
    (eur * Decimal::from(100)).ceil().to_u64().unwrap_or(u64::MAX)
}

/// Round an EUR ceiling down to whole cents (conservative for bounds).
pub(crate) fn eur_to_cents_floor(eur: Decimal) -> u64 {
    (eur * Decimal::from(100)).floor().to_u64().unwrap_or(u64::MAX)
}

// ============================================================================
// Routing Engine
// ============================================================================

/// Scored candidate, internal to ranking.
struct Scored {
    candidate: Candidate,
    estimated_cents: u64,
    estimated_eur: Decimal,
    health: f64,
    latency_ms: u64,
    edge_first: bool,
    score: f64,
    dominant: &'static str,
}

/// The routing decision core.
///
/// Holds shared references to the read-mostly collaborators; all state it
/// touches is owned by them, so `route` can run fully in parallel across
/// requests.
pub struct RoutingEngine {
    registry: Arc<ProviderRegistry>,
    health: Arc<HealthMonitor>,
    governor: Arc<CostGovernor>,
    config: RoutingConfig,
    estimator: Arc<dyn TokenEstimator>,
}

impl RoutingEngine {
    /// Create a routing engine over the shared collaborators.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        health: Arc<HealthMonitor>,
        governor: Arc<CostGovernor>,
        config: RoutingConfig,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Self {
        Self {
            registry,
            health,
            governor,
            config,
            estimator,
        }
    }

    /// Route a request to a provider/model pair.
    ///
    /// On success the governor holds one reservation for the chosen
    /// candidate, keyed by the request id; completion telemetry settles it.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidRequest`] for malformed input,
    /// [`EngineError::NoRouteAvailable`] when capabilities or the model
    /// override cannot be satisfied, [`EngineError::BudgetExceeded`] when
    /// every admissible candidate is refused on cost grounds.
    pub fn route(&self, request: &AIRequest) -> Result<RoutingDecision, EngineError> {
        request.validate()?;

        let required = request.required_capability_set();
        let mut candidates = self.registry.list_candidates(&required, &request.languages);

        if let Some(ref model) = request.model_override {
            candidates.retain(|c| c.model_id() == model.as_str());
            if candidates.is_empty() {
                return Err(EngineError::NoRouteAvailable(format!(
                    "model override '{model}' matches no capable provider"
                )));
            }
        }
        if candidates.is_empty() {
            let caps: Vec<String> = required.iter().map(ToString::to_string).collect();
            return Err(EngineError::NoRouteAvailable(format!(
                "no provider satisfies capabilities [{}]",
                caps.join(", ")
            )));
        }

        let input_tokens = request.effective_tokens(self.estimator.as_ref());
        let output_tokens = (input_tokens as f64 * self.config.output_token_ratio) as u64;

        let ceiling_cents = self.request_ceiling_cents(request);
        let (ranked, cheapest_over) =
            self.rank(request, candidates, input_tokens, output_tokens, ceiling_cents);

        if ranked.is_empty() {
            // Capability matches existed, every one was over the request's
            // own ceiling
            let (estimated_cents, ceiling_cents) =
                cheapest_over.unwrap_or((0, ceiling_cents.unwrap_or(0)));
            return Err(EngineError::BudgetExceeded {
                org_id: request.org_id.clone(),
                reason: RejectionReason::RequestCeilingExceeded {
                    estimated_cents,
                    ceiling_cents,
                },
            });
        }

        let mut last_rejection = None;
        for (index, scored) in ranked.iter().enumerate() {
            match self.governor.admit(
                &request.org_id,
                &request.request_id,
                &scored.candidate.provider.id,
                scored.estimated_cents,
            ) {
                Ok(()) => return Ok(self.decision(request, &ranked, index)),
                Err(reason) => {
                    tracing::debug!(
                        request = %request.request_id,
                        provider = %scored.candidate.provider.id,
                        %reason,
                        "candidate refused admission"
                    );
                    last_rejection = Some(reason);
                }
            }
        }

        Err(EngineError::BudgetExceeded {
            org_id: request.org_id.clone(),
            reason: last_rejection.unwrap_or(RejectionReason::EmergencyStopped),
        })
    }

    /// The request's own cost ceiling in cents, from `budget_cents` and
    /// `max_cost_eur` (whichever is tighter), `None` when unbounded.
    fn request_ceiling_cents(&self, request: &AIRequest) -> Option<u64> {
        let budget = (request.budget_cents > 0).then_some(request.budget_cents);
        let max_eur = request.max_cost_eur.map(eur_to_cents_floor);
        match (budget, max_eur) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Score and order candidates. Returns the ranked survivors plus the
    /// cheapest over-ceiling estimate (for error reporting) when the
    /// ceiling filtered everything out.
    fn rank(
        &self,
        request: &AIRequest,
        candidates: Vec<Candidate>,
        input_tokens: u64,
        output_tokens: u64,
        ceiling_cents: Option<u64>,
    ) -> (Vec<Scored>, Option<(u64, u64)>) {
        let edge_preferred = request.edge_preferred();
        let (cost_weight, latency_weight) = if request.priority.latency_sensitive() {
            (LATENCY_WEIGHT, COST_WEIGHT)
        } else {
            (COST_WEIGHT, LATENCY_WEIGHT)
        };

        let mut cheapest_over: Option<(u64, u64)> = None;
        let mut scored: Vec<Scored> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let estimated_eur = candidate.price().cost_eur(input_tokens, output_tokens);
            let estimated_cents = eur_to_cents_ceil(estimated_eur);

            if let Some(ceiling) = ceiling_cents {
                if estimated_cents > ceiling {
                    let over = (estimated_cents, ceiling);
                    cheapest_over = Some(match cheapest_over {
                        Some(best) if best.0 <= estimated_cents => best,
                        _ => over,
                    });
                    continue;
                }
            }

            let provider_id = &candidate.provider.id;
            scored.push(Scored {
                health: self.health.score(provider_id),
                latency_ms: self.health.avg_latency_ms(provider_id),
                edge_first: edge_preferred && candidate.region() == Region::Edge,
                score: 0.0,
                dominant: "",
                estimated_cents,
                estimated_eur,
                candidate,
            });
        }

        if scored.is_empty() {
            return (scored, cheapest_over);
        }

        // Min-max normalize cost and latency over the surviving set so the
        // weights compare like with like
        let min_cost = scored.iter().map(|s| s.estimated_cents).min().unwrap_or(0);
        let max_cost = scored.iter().map(|s| s.estimated_cents).max().unwrap_or(0);
        let min_latency = scored.iter().map(|s| s.latency_ms).min().unwrap_or(0);
        let max_latency = scored.iter().map(|s| s.latency_ms).max().unwrap_or(0);

        let normalize = |value: u64, min: u64, max: u64| -> f64 {
            if max > min {
                (value - min) as f64 / (max - min) as f64
            } else {
                0.0
            }
        };

        for s in &mut scored {
            let health_term = HEALTH_WEIGHT * s.health;
            let cost_term =
                cost_weight * (1.0 - normalize(s.estimated_cents, min_cost, max_cost));
            let latency_term =
                latency_weight * (1.0 - normalize(s.latency_ms, min_latency, max_latency));
            s.score = health_term + cost_term + latency_term;
            s.dominant = if health_term >= cost_term && health_term >= latency_term {
                "healthiest provider"
            } else if cost_term >= latency_term {
                "lowest cost within budget"
            } else {
                "lowest latency"
            };
        }

        scored.sort_by(|a, b| {
            b.edge_first
                .cmp(&a.edge_first)
                .then_with(|| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.candidate.provider.id.cmp(&b.candidate.provider.id))
                .then_with(|| a.candidate.model_id().cmp(b.candidate.model_id()))
        });

        (scored, None)
    }

    /// Assemble the decision for the admitted candidate at `index`.
    fn decision(
        &self,
        request: &AIRequest,
        ranked: &[Scored],
        index: usize,
    ) -> RoutingDecision {
        let chosen = &ranked[index];
        let fallback_chain: Vec<ProviderModelRef> = ranked
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .skip(index)
            .take(self.config.fallback_depth)
            .map(|(_, s)| ProviderModelRef {
                provider_id: s.candidate.provider.id.clone(),
                model_id: s.candidate.model_id().to_string(),
            })
            .collect();

        let routing_reason = if request.model_override.is_some() {
            "model override".to_string()
        } else if chosen.edge_first {
            if request.sensitivity.requires_redaction() {
                "edge preferred for confidential content".to_string()
            } else {
                "edge preferred by request".to_string()
            }
        } else if ranked.len() == 1 {
            "only capability match".to_string()
        } else {
            chosen.dominant.to_string()
        };

        let redaction_required =
            request.sensitivity.requires_redaction() && chosen.candidate.region() == Region::Cloud;

        let decision = RoutingDecision {
            request_id: request.request_id.clone(),
            org_id: request.org_id.clone(),
            provider_id: chosen.candidate.provider.id.clone(),
            model_id: chosen.candidate.model_id().to_string(),
            region: chosen.candidate.region(),
            estimated_cost_cents: chosen.estimated_cents,
            estimated_cost_eur: chosen.estimated_eur,
            routing_reason,
            fallback_chain,
            redaction_required,
        };

        tracing::info!(
            request = %decision.request_id,
            org = %decision.org_id,
            provider = %decision.provider_id,
            model = %decision.model_id,
            region = ?decision.region,
            estimated_cents = decision.estimated_cost_cents,
            reason = %decision.routing_reason,
            fallbacks = decision.fallback_chain.len(),
            "request routed"
        );
        decision
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertSender;
    use crate::config::{HealthConfig, RoutingConfig};
    use crate::governor::OrgLimits;
    use crate::registry::{ModelSpec, PriceTable, Provider};
    use crate::request::{Capability, HeuristicEstimator, Priority, Sensitivity, TaskType};

    struct Fixture {
        registry: Arc<ProviderRegistry>,
        health: Arc<HealthMonitor>,
        governor: Arc<CostGovernor>,
        engine: RoutingEngine,
    }

    fn fixture_with_limits(limits: OrgLimits) -> Fixture {
        let registry = Arc::new(ProviderRegistry::new());
        let health = Arc::new(HealthMonitor::new(HealthConfig::default()));
        let governor = Arc::new(CostGovernor::new(limits, AlertSender::disabled()));
        let engine = RoutingEngine::new(
            registry.clone(),
            health.clone(),
            governor.clone(),
            RoutingConfig::default(),
            Arc::new(HeuristicEstimator::default()),
        );
        Fixture {
            registry,
            health,
            governor,
            engine,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_limits(OrgLimits {
            daily_limit_cents: 1_000_000,
            monthly_limit_cents: 10_000_000,
            per_request_limit_cents: 1_000_000,
            emergency_stop_threshold_cents: 900_000,
            ..OrgLimits::default()
        })
    }

    fn cloud(id: &str, input_per_1k: Decimal) -> Provider {
        Provider::new(id, Region::Cloud)
            .with_capabilities(["text-generation", "function-calling"])
            .with_languages(["en", "es"])
            .with_price(PriceTable {
                input_per_1k,
                output_per_1k: input_per_1k * Decimal::from(3),
            })
            .with_model(ModelSpec::new(format!("{id}-default")))
    }

    fn edge(id: &str) -> Provider {
        Provider::new(id, Region::Edge)
            .with_capabilities(["text-generation"])
            .with_languages(["en", "es"])
            .with_model(ModelSpec::new(format!("{id}-7b")))
    }

    fn request(tokens: u64) -> AIRequest {
        AIRequest::new("org-1", TaskType::Summarize, "content").with_tokens_est(tokens)
    }

    #[test]
    fn test_no_capability_match_is_no_route() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 3)));

        let req = request(1000).with_capability(Capability::Vision);
        let err = fx.engine.route(&req).unwrap_err();
        assert!(matches!(err, EngineError::NoRouteAvailable(_)));
    }

    #[test]
    fn test_empty_registry_is_no_route() {
        let fx = fixture();
        let err = fx.engine.route(&request(1000)).unwrap_err();
        assert!(matches!(err, EngineError::NoRouteAvailable(_)));
    }

    #[test]
    fn test_cheapest_wins_on_equal_health() {
        let fx = fixture();
        fx.registry.register(cloud("pricey", Decimal::new(5, 2)));
        fx.registry.register(cloud("thrifty", Decimal::new(5, 3)));

        let decision = fx.engine.route(&request(1000)).unwrap();
        assert_eq!(decision.provider_id, "thrifty");
        assert_eq!(decision.routing_reason, "lowest cost within budget");
    }

    #[test]
    fn test_edge_ranked_first_for_pii() {
        let fx = fixture();
        fx.registry.register(cloud("cloudy", Decimal::new(1, 4)));
        fx.registry.register(edge("local"));

        let req = request(1000).with_sensitivity(Sensitivity::Pii);
        let decision = fx.engine.route(&req).unwrap();
        assert_eq!(decision.provider_id, "local");
        assert_eq!(decision.region, Region::Edge);
        assert_eq!(
            decision.routing_reason,
            "edge preferred for confidential content"
        );
        assert!(!decision.redaction_required);
    }

    #[test]
    fn test_pii_falls_back_to_cloud_when_no_edge() {
        let fx = fixture();
        fx.registry.register(cloud("cloudy", Decimal::new(1, 4)));

        let req = request(1000).with_sensitivity(Sensitivity::Pii);
        let decision = fx.engine.route(&req).unwrap();
        assert_eq!(decision.provider_id, "cloudy");
        assert!(decision.redaction_required);
    }

    #[test]
    fn test_model_override_restricts() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 3)));
        fx.registry.register(cloud("beta", Decimal::new(1, 3)));

        let req = request(1000).with_model_override("alpha-default");
        let decision = fx.engine.route(&req).unwrap();
        assert_eq!(decision.provider_id, "alpha");
        assert_eq!(decision.routing_reason, "model override");
    }

    #[test]
    fn test_unknown_model_override_is_no_route() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 3)));

        let req = request(1000).with_model_override("ghost-model");
        assert!(matches!(
            fx.engine.route(&req).unwrap_err(),
            EngineError::NoRouteAvailable(_)
        ));
    }

    #[test]
    fn test_request_ceiling_filters_to_budget_exceeded() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 2)));

        // 100K tokens at 0.05/1K in + 0.15/1K out is far above one cent
        let req = request(100_000).with_max_cost_eur(Decimal::new(1, 2));
        let err = fx.engine.route(&req).unwrap_err();
        assert!(matches!(
            err,
            EngineError::BudgetExceeded {
                reason: RejectionReason::RequestCeilingExceeded { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_budget_cents_bounds_like_max_cost() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 2)));

        let req = request(100_000).with_budget_cents(50);
        let err = fx.engine.route(&req).unwrap_err();
        assert!(matches!(
            err,
            EngineError::BudgetExceeded {
                reason: RejectionReason::RequestCeilingExceeded { ceiling_cents: 50, .. },
                ..
            }
        ));
    }

    #[test]
    fn test_governor_rejection_surfaces_as_budget_exceeded() {
        let fx = fixture_with_limits(OrgLimits {
            daily_limit_cents: 1,
            monthly_limit_cents: 1,
            per_request_limit_cents: 1,
            emergency_stop_threshold_cents: 0,
            ..OrgLimits::default()
        });
        fx.registry.register(cloud("alpha", Decimal::new(5, 2)));

        let err = fx.engine.route(&request(100_000)).unwrap_err();
        assert!(matches!(err, EngineError::BudgetExceeded { .. }));
        assert_eq!(fx.governor.active_reservations(), 0);
    }

    #[test]
    fn test_route_holds_one_reservation() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 3)));
        fx.registry.register(cloud("beta", Decimal::new(1, 3)));

        let decision = fx.engine.route(&request(1000)).unwrap();
        assert_eq!(fx.governor.active_reservations(), 1);
        assert!(decision.estimated_cost_cents > 0);
    }

    #[test]
    fn test_fallback_chain_depth_and_exclusion() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(1, 3)));
        fx.registry.register(cloud("beta", Decimal::new(2, 3)));
        fx.registry.register(cloud("gamma", Decimal::new(3, 3)));
        fx.registry.register(cloud("delta", Decimal::new(4, 3)));

        let decision = fx.engine.route(&request(1000)).unwrap();
        assert_eq!(decision.fallback_chain.len(), 2);
        assert!(decision
            .fallback_chain
            .iter()
            .all(|f| f.provider_id != decision.provider_id));
    }

    #[test]
    fn test_failing_provider_loses_routing() {
        let fx = fixture();
        fx.registry.register(cloud("flaky", Decimal::new(5, 3)));
        fx.registry.register(cloud("steady", Decimal::new(5, 3)));

        // 5 consecutive failures drive the flaky provider's score down
        for _ in 0..5 {
            fx.health.record_sample("flaky", 1000, false);
        }

        let decision = fx.engine.route(&request(1000)).unwrap();
        assert_eq!(decision.provider_id, "steady");
    }

    #[test]
    fn test_priority_inverts_cost_latency_tradeoff() {
        let fx = fixture();
        // fast but expensive vs slow but cheap
        fx.registry.register(cloud("fast", Decimal::new(5, 2)));
        fx.registry.register(cloud("slow", Decimal::new(5, 3)));
        for _ in 0..50 {
            fx.health.record_sample("fast", 500, true);
            fx.health.record_sample("slow", 1500, true);
        }

        let medium = fx.engine.route(&request(1000)).unwrap();
        assert_eq!(medium.provider_id, "slow");
        fx.governor.release(&medium.request_id);

        let critical = fx
            .engine
            .route(&request(1000).with_priority(Priority::Critical))
            .unwrap();
        assert_eq!(critical.provider_id, "fast");
    }

    #[test]
    fn test_routing_is_deterministic() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 3)));
        fx.registry.register(cloud("beta", Decimal::new(5, 3)));
        fx.registry.register(edge("local"));

        let first = fx.engine.route(&request(1000)).unwrap();
        fx.governor.release(&first.request_id);
        let second = fx.engine.route(&request(1000)).unwrap();

        assert_eq!(first.provider_id, second.provider_id);
        assert_eq!(first.model_id, second.model_id);
        assert_eq!(first.fallback_chain, second.fallback_chain);
        assert_eq!(first.routing_reason, second.routing_reason);
    }

    #[test]
    fn test_single_candidate_reason() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 3)));

        let decision = fx.engine.route(&request(1000)).unwrap();
        assert_eq!(decision.routing_reason, "only capability match");
    }

    #[test]
    fn test_invalid_request_rejected_before_state() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 3)));

        let mut req = request(1000);
        req.org_id = String::new();
        assert!(matches!(
            fx.engine.route(&req).unwrap_err(),
            EngineError::InvalidRequest(_)
        ));
        assert_eq!(fx.governor.active_reservations(), 0);
    }

    #[test]
    fn test_language_constraint_drops_providers() {
        let fx = fixture();
        fx.registry.register(cloud("alpha", Decimal::new(5, 3)));

        let req = request(1000).with_languages(vec!["ja".to_string()]);
        assert!(matches!(
            fx.engine.route(&req).unwrap_err(),
            EngineError::NoRouteAvailable(_)
        ));
    }

    #[test]
    fn test_cents_rounding() {
        assert_eq!(eur_to_cents_ceil(Decimal::new(1, 3)), 1); // 0.001 EUR -> 1c
        assert_eq!(eur_to_cents_ceil(Decimal::new(25, 3)), 3); // 0.025 -> 3c
        assert_eq!(eur_to_cents_ceil(Decimal::ZERO), 0);
        assert_eq!(eur_to_cents_floor(Decimal::new(199, 2)), 199);
        assert_eq!(eur_to_cents_floor(Decimal::new(1999, 3)), 199);
    }
}
