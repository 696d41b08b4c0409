//! Gateway Core - AI Request Routing and Cost Governance
//!
//! This crate decides, for every inbound AI task from any tenant, which
//! provider/model serves it, enforces multi-level spending limits, redacts
//! sensitive content before it leaves the trust boundary, and keeps a live
//! picture of provider health and organizational spend under concurrent
//! load. It performs no I/O of its own: provider transports, alert
//! delivery, and metric sinks are external collaborators.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        GatewayEngine                             │
//! │                                                                  │
//! │  AIRequest ──> RoutingEngine ──────────────> RoutingDecision     │
//! │                 │        │                        │              │
//! │          ┌──────┘        └──────┐                 v              │
//! │          v                      v          ContentSanitizer      │
//! │  ProviderRegistry          CostGovernor           │              │
//! │   (catalog snapshot)        (reserve)             v              │
//! │          ^                      ^          caller calls provider │
//! │          │                      │                 │              │
//! │   HealthMonitor <── TelemetryRecorder <───────────┘              │
//! │    (EMA scores)     (commit/release)                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`GatewayEngine`]: explicitly constructed engine instance — no global
//!   state; handlers share a reference
//! - [`AIRequest`]: one tenant task with classification and constraints
//! - [`RoutingDecision`]: the chosen provider/model plus fallback chain
//! - [`CostGovernor`]: per-org reserve→commit/release spend accounting
//! - [`HealthMonitor`]: per-provider EMA scores with staleness decay
//! - [`ContentSanitizer`]: sensitivity-gated PII redaction
//!
//! # Quick Start
//!
//! ```
//! use gateway_core::{
//!     AIRequest, CompletionReport, EngineConfig, GatewayEngine, ModelSpec,
//!     Provider, Region, TaskType,
//! };
//!
//! let engine = GatewayEngine::new(EngineConfig::default());
//! engine.register_provider(
//!     Provider::new("mistral-edge", Region::Edge)
//!         .with_capabilities(["text-generation"])
//!         .with_model(ModelSpec::new("mistral-7b-instruct")),
//! );
//!
//! let request = AIRequest::new("org-1", TaskType::Summarize, "quarterly report...")
//!     .with_tokens_est(1200);
//! let decision = engine.route_request(&request).expect("route");
//!
//! let content = engine.process_request_content(&request.content, &decision, &request);
//! // ... caller invokes the provider transport with content.content ...
//!
//! engine.record_request_completion(&CompletionReport {
//!     request_id: request.request_id.clone(),
//!     success: true,
//!     actual_cost_cents: decision.estimated_cost_cents,
//!     input_tokens: 1200,
//!     output_tokens: 400,
//!     latency_ms: 900,
//! });
//! ```
//!
//! # Module Overview
//!
//! - [`request`]: request model, classification vocabulary, token estimation
//! - [`registry`]: provider catalog with atomic snapshot swaps
//! - [`health`]: per-provider health scoring
//! - [`governor`]: spend limits, reservations, emergency stop
//! - [`sanitizer`]: PII redaction gate
//! - [`router`]: candidate ranking and decision assembly
//! - [`telemetry`]: completion ingestion and engine counters
//! - [`alerts`]: budget warning / emergency events
//! - [`config`]: engine configuration and TOML loading
//! - [`engine`]: the facade wiring it all together

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use tracing_subscriber::EnvFilter;

pub mod alerts;
pub mod config;
pub mod engine;
pub mod governor;
pub mod health;
pub mod registry;
pub mod request;
pub mod router;
pub mod sanitizer;
pub mod telemetry;

// Re-exports for convenience
pub use alerts::{AlertEvent, AlertSender, AlertSeverity, ClearedBy, LimitPeriod};
pub use config::{
    AlertsConfig, ConfigError, EngineConfig, GovernorConfig, HealthConfig, RoutingConfig,
    TelemetryConfig,
};
pub use engine::{GatewayEngine, SystemStats};
pub use governor::{
    CostGovernor, GovernorTotals, OrgLimits, OrgLimitsUpdate, OrgUsageSnapshot,
    RejectionReason, Reservation,
};
pub use health::{HealthMonitor, HealthSnapshot, ProviderHealth};
pub use registry::{Candidate, ModelSpec, PriceTable, Provider, ProviderRegistry, Region};
pub use request::{
    AIRequest, Capability, HeuristicEstimator, InvalidRequest, Priority, Sensitivity,
    TaskType, TokenEstimator,
};
pub use router::{EngineError, ProviderModelRef, RoutingDecision, RoutingEngine};
pub use sanitizer::{ContentSanitizer, SanitizedContent};
pub use telemetry::{CompletionReport, TelemetryRecorder, TelemetryStats};

/// Initialise the global tracing subscriber.
///
/// Filter level is controlled by `RUST_LOG` (e.g. `RUST_LOG=info`).
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set (e.g. by a
/// previous call or a test harness).
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
}
