//! AI Request Model and Classification
//!
//! The [`AIRequest`] is the unit of work entering the engine: one tenant task
//! to be served by some provider/model pair. This module defines the request
//! itself, the closed vocabulary used to classify it (task type, sensitivity,
//! priority, capabilities), request validation, and the pluggable token
//! estimator used when a caller submits no estimate of its own.
//!
//! Classification is a pure function: deriving required capabilities from the
//! task type touches no shared state, so it can run fully in parallel across
//! requests.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Task Classification
// ============================================================================

/// Classification of the task a request asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Draft an outbound email from context
    DraftEmail,

    /// Extract structured data from an invoice
    AnalyzeInvoice,

    /// Summarize a document or thread
    Summarize,

    /// Assign a label from a known set
    Classify,

    /// Anything without a more specific shape
    #[default]
    Generic,
}

impl TaskType {
    /// Capabilities a provider must offer to serve this task type.
    ///
    /// Explicit `required_capabilities` on the request are unioned with these
    /// during classification; see [`AIRequest::required_capability_set`].
    #[must_use]
    pub fn derived_capabilities(&self) -> Vec<Capability> {
        match self {
            Self::DraftEmail | Self::Summarize | Self::Classify | Self::Generic => {
                vec![Capability::TextGeneration]
            }
            // Invoice analysis extracts structured fields through function calls
            Self::AnalyzeInvoice => {
                vec![Capability::TextGeneration, Capability::FunctionCalling]
            }
        }
    }
}

/// Declared sensitivity of the request content.
///
/// Sensitivity drives two distinct mechanisms: a rank boost toward
/// edge-region candidates during routing, and the hard redaction gate in the
/// sanitizer when content is bound for a cloud provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    /// Freely shareable content
    Public,

    /// Internal business content, no personal data
    #[default]
    Internal,

    /// Commercially confidential content
    Confidential,

    /// Content containing personal data
    Pii,
}

impl Sensitivity {
    /// Whether content at this level must be redacted before leaving the
    /// trust boundary to a cloud provider.
    #[must_use]
    pub fn requires_redaction(&self) -> bool {
        matches!(self, Self::Confidential | Self::Pii)
    }
}

/// Request priority for scheduling and scoring.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background work, cost over latency
    Low,

    /// Normal interactive work
    #[default]
    Medium,

    /// User is waiting on the result
    High,

    /// Latency outranks cost entirely
    Critical,
}

impl Priority {
    /// Whether this priority prefers the lowest latency over the lowest cost.
    ///
    /// High and critical requests invert the cost/latency scoring weights.
    #[must_use]
    pub fn latency_sensitive(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// A provider/model capability.
///
/// Known capabilities are a closed set so routing logic can match on them
/// exhaustively; anything else round-trips untouched through
/// [`Capability::Other`]. The wire format is the kebab-case string form
/// (`"function-calling"`, `"vision"`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Capability {
    /// Plain text generation
    TextGeneration,
    /// Tool / function calling
    FunctionCalling,
    /// Image understanding
    Vision,
    /// Sandboxed code execution
    CodeInterpreter,
    /// Embedding generation
    Embeddings,
    /// Token streaming
    Streaming,
    /// Strong non-English coverage
    Multilingual,
    /// Capability the engine does not interpret, passed through untouched
    Other(String),
}

impl Capability {
    /// The kebab-case wire string for this capability.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::TextGeneration => "text-generation",
            Self::FunctionCalling => "function-calling",
            Self::Vision => "vision",
            Self::CodeInterpreter => "code-interpreter",
            Self::Embeddings => "embeddings",
            Self::Streaming => "streaming",
            Self::Multilingual => "multilingual",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Capability {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text-generation" => Self::TextGeneration,
            "function-calling" => Self::FunctionCalling,
            "vision" => Self::Vision,
            "code-interpreter" => Self::CodeInterpreter,
            "embeddings" => Self::Embeddings,
            "streaming" => Self::Streaming,
            "multilingual" => Self::Multilingual,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Capability> for String {
    fn from(c: Capability) -> Self {
        c.as_str().to_string()
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Token Estimation
// ============================================================================

/// Pluggable token estimator.
///
/// `tokens_est` is a caller-supplied input; the estimator is only consulted
/// when a caller passes zero with non-empty content. Implementations must be
/// cheap and side-effect free — estimation runs on the routing hot path.
pub trait TokenEstimator: Send + Sync {
    /// Estimate the input token count for `content`.
    fn estimate(&self, content: &str) -> u64;
}

/// Length-based token estimator.
///
/// Approximates one token per `chars_per_token` characters of content.
#[derive(Clone, Debug)]
pub struct HeuristicEstimator {
    /// Characters assumed per token
    pub chars_per_token: u64,
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self { chars_per_token: 4 }
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, content: &str) -> u64 {
        (content.chars().count() as u64).div_ceil(self.chars_per_token.max(1))
    }
}

// ============================================================================
// AI Request
// ============================================================================

/// Rejection of a malformed request. Caller bug, not retryable.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    /// The organization id is empty
    #[error("org_id must not be empty")]
    EmptyOrgId,

    /// The request id is empty
    #[error("request_id must not be empty")]
    EmptyRequestId,

    /// `max_cost_eur`, if present, must be strictly positive
    #[error("max_cost_eur must be > 0, got {0}")]
    NonPositiveMaxCost(Decimal),

    /// An explicit model override must not be an empty string
    #[error("model_override must not be empty")]
    EmptyModelOverride,
}

/// An inbound AI task from a tenant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AIRequest {
    /// Unique request id, used for reservation tracking and telemetry
    pub request_id: String,

    /// Owning organization (pre-validated by the auth layer)
    pub org_id: String,

    /// Task classification
    pub task_type: TaskType,

    /// The content to process
    pub content: String,

    /// Caller-estimated input tokens; 0 means "estimate for me"
    pub tokens_est: u64,

    /// Request-level spend ceiling in cents; 0 means unbounded at this level
    pub budget_cents: u64,

    /// Declared content sensitivity
    pub sensitivity: Sensitivity,

    /// Capabilities the caller explicitly requires
    pub required_capabilities: HashSet<Capability>,

    /// Languages the response may need, in preference order
    pub languages: Vec<String>,

    /// Pin routing to one specific model, if set
    pub model_override: Option<String>,

    /// Rank edge-region candidates first
    pub prefer_edge: bool,

    /// Hard cost ceiling in EUR for this request
    pub max_cost_eur: Option<Decimal>,

    /// Scheduling priority
    pub priority: Priority,

    /// Opaque caller metadata, passed through untouched
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AIRequest {
    /// Create a request with a generated id and defaults.
    pub fn new(
        org_id: impl Into<String>,
        task_type: TaskType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            org_id: org_id.into(),
            task_type,
            content: content.into(),
            tokens_est: 0,
            budget_cents: 0,
            sensitivity: Sensitivity::default(),
            required_capabilities: HashSet::new(),
            languages: Vec::new(),
            model_override: None,
            prefer_edge: false,
            max_cost_eur: None,
            priority: Priority::default(),
            metadata: HashMap::new(),
        }
    }

    /// Set the estimated input tokens.
    #[must_use]
    pub fn with_tokens_est(mut self, tokens: u64) -> Self {
        self.tokens_est = tokens;
        self
    }

    /// Set the request-level budget ceiling in cents.
    #[must_use]
    pub fn with_budget_cents(mut self, cents: u64) -> Self {
        self.budget_cents = cents;
        self
    }

    /// Set the content sensitivity.
    #[must_use]
    pub fn with_sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Require an additional capability.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<Capability>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }

    /// Set the requested languages.
    #[must_use]
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    /// Pin routing to a specific model.
    #[must_use]
    pub fn with_model_override(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    /// Prefer edge-region candidates.
    #[must_use]
    pub fn with_prefer_edge(mut self, prefer: bool) -> Self {
        self.prefer_edge = prefer;
        self
    }

    /// Set the hard EUR cost ceiling.
    #[must_use]
    pub fn with_max_cost_eur(mut self, max: Decimal) -> Self {
        self.max_cost_eur = Some(max);
        self
    }

    /// Set the scheduling priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Check structural invariants. Malformed requests are a caller bug and
    /// are rejected before any state is touched.
    pub fn validate(&self) -> Result<(), InvalidRequest> {
        if self.org_id.trim().is_empty() {
            return Err(InvalidRequest::EmptyOrgId);
        }
        if self.request_id.trim().is_empty() {
            return Err(InvalidRequest::EmptyRequestId);
        }
        if let Some(max) = self.max_cost_eur {
            if max <= Decimal::ZERO {
                return Err(InvalidRequest::NonPositiveMaxCost(max));
            }
        }
        if let Some(ref model) = self.model_override {
            if model.trim().is_empty() {
                return Err(InvalidRequest::EmptyModelOverride);
            }
        }
        Ok(())
    }

    /// Full capability requirement: capabilities derived from the task type
    /// unioned with the caller's explicit requirements.
    #[must_use]
    pub fn required_capability_set(&self) -> HashSet<Capability> {
        let mut caps: HashSet<Capability> =
            self.task_type.derived_capabilities().into_iter().collect();
        caps.extend(self.required_capabilities.iter().cloned());
        caps
    }

    /// Input tokens to cost against: the caller's estimate when supplied,
    /// otherwise the estimator's.
    #[must_use]
    pub fn effective_tokens(&self, estimator: &dyn TokenEstimator) -> u64 {
        if self.tokens_est > 0 || self.content.is_empty() {
            self.tokens_est
        } else {
            estimator.estimate(&self.content)
        }
    }

    /// Whether routing should rank edge candidates first for this request.
    #[must_use]
    pub fn edge_preferred(&self) -> bool {
        self.prefer_edge || self.sensitivity.requires_redaction()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_round_trip() {
        for s in [
            "text-generation",
            "function-calling",
            "vision",
            "code-interpreter",
            "embeddings",
            "streaming",
            "multilingual",
        ] {
            let cap = Capability::from(s);
            assert!(!matches!(cap, Capability::Other(_)), "{s} should be known");
            assert_eq!(cap.as_str(), s);
        }
    }

    #[test]
    fn test_unknown_capability_passes_through() {
        let cap = Capability::from("audio-transcription");
        assert_eq!(cap, Capability::Other("audio-transcription".to_string()));
        assert_eq!(cap.as_str(), "audio-transcription");
    }

    #[test]
    fn test_task_type_capability_derivation() {
        assert_eq!(
            TaskType::DraftEmail.derived_capabilities(),
            vec![Capability::TextGeneration]
        );
        assert!(TaskType::AnalyzeInvoice
            .derived_capabilities()
            .contains(&Capability::FunctionCalling));
    }

    #[test]
    fn test_required_capability_set_unions_explicit() {
        let request = AIRequest::new("org-1", TaskType::Summarize, "text")
            .with_capability(Capability::Vision);

        let caps = request.required_capability_set();
        assert!(caps.contains(&Capability::TextGeneration));
        assert!(caps.contains(&Capability::Vision));
        assert_eq!(caps.len(), 2);
    }

    #[test]
    fn test_sensitivity_redaction_gate() {
        assert!(!Sensitivity::Public.requires_redaction());
        assert!(!Sensitivity::Internal.requires_redaction());
        assert!(Sensitivity::Confidential.requires_redaction());
        assert!(Sensitivity::Pii.requires_redaction());
    }

    #[test]
    fn test_edge_preferred_from_sensitivity_or_flag() {
        let confidential = AIRequest::new("org-1", TaskType::Generic, "x")
            .with_sensitivity(Sensitivity::Confidential);
        assert!(confidential.edge_preferred());

        let flagged = AIRequest::new("org-1", TaskType::Generic, "x").with_prefer_edge(true);
        assert!(flagged.edge_preferred());

        let neither = AIRequest::new("org-1", TaskType::Generic, "x");
        assert!(!neither.edge_preferred());
    }

    #[test]
    fn test_validate_rejects_empty_org() {
        let mut request = AIRequest::new("", TaskType::Generic, "x");
        assert_eq!(request.validate(), Err(InvalidRequest::EmptyOrgId));

        request.org_id = "org-1".to_string();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_max_cost() {
        let request = AIRequest::new("org-1", TaskType::Generic, "x")
            .with_max_cost_eur(Decimal::ZERO);
        assert!(matches!(
            request.validate(),
            Err(InvalidRequest::NonPositiveMaxCost(_))
        ));
    }

    #[test]
    fn test_heuristic_estimator_length_quarter() {
        let estimator = HeuristicEstimator::default();
        assert_eq!(estimator.estimate(""), 0);
        assert_eq!(estimator.estimate("abcd"), 1);
        assert_eq!(estimator.estimate("abcde"), 2);
        assert_eq!(estimator.estimate(&"x".repeat(400)), 100);
    }

    #[test]
    fn test_effective_tokens_prefers_caller_estimate() {
        let estimator = HeuristicEstimator::default();

        let explicit = AIRequest::new("org-1", TaskType::Generic, "some long content here")
            .with_tokens_est(500);
        assert_eq!(explicit.effective_tokens(&estimator), 500);

        let implicit = AIRequest::new("org-1", TaskType::Generic, "abcdefgh");
        assert_eq!(implicit.effective_tokens(&estimator), 2);
    }

    #[test]
    fn test_priority_latency_sensitivity() {
        assert!(Priority::Critical.latency_sensitive());
        assert!(Priority::High.latency_sensitive());
        assert!(!Priority::Medium.latency_sensitive());
        assert!(!Priority::Low.latency_sensitive());
    }

    #[test]
    fn test_new_request_has_unique_ids() {
        let a = AIRequest::new("org-1", TaskType::Generic, "x");
        let b = AIRequest::new("org-1", TaskType::Generic, "x");
        assert_ne!(a.request_id, b.request_id);
    }
}
