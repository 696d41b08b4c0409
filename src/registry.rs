//! Provider Registry
//!
//! The catalog of available provider/model pairs: regions, capability sets,
//! price tables, and per-model overrides. The registry is the read side of
//! routing — candidate listing must never observe a half-applied update, so
//! every mutation builds a fresh catalog and swaps it in atomically behind a
//! short lock. In-flight routing keeps whatever snapshot it already cloned.
//!
//! When nothing matches, [`ProviderRegistry::list_candidates`] returns an
//! empty set rather than an error; the routing engine treats that as a
//! no-route outcome.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::request::Capability;

// ============================================================================
// Catalog Types
// ============================================================================

/// Deployment region of a provider relative to the trust boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// Deployed inside the organization's trust boundary; content leaves
    /// unredacted
    Edge,

    /// External hosted API; sensitive content is redacted before transit
    Cloud,
}

/// Price per 1K input/output tokens, in EUR.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    /// EUR per 1K input tokens
    pub input_per_1k: Decimal,

    /// EUR per 1K output tokens
    pub output_per_1k: Decimal,
}

impl PriceTable {
    /// A zero-cost table (edge/self-hosted deployments).
    #[must_use]
    pub fn free() -> Self {
        Self {
            input_per_1k: Decimal::ZERO,
            output_per_1k: Decimal::ZERO,
        }
    }

    /// Cost in EUR for the given token counts.
    #[must_use]
    pub fn cost_eur(&self, input_tokens: u64, output_tokens: u64) -> Decimal {
        let thousand = Decimal::from(1000);
        Decimal::from(input_tokens) / thousand * self.input_per_1k
            + Decimal::from(output_tokens) / thousand * self.output_per_1k
    }
}

/// A model registered under a provider.
///
/// Empty `capabilities` means the model inherits the provider's set; a
/// non-empty set overrides it entirely. The same rule applies to `price`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model identifier
    pub id: String,

    /// Human-readable name
    pub display_name: String,

    /// Context window in tokens
    pub context_window: u32,

    /// Maximum output tokens per completion
    pub max_output_tokens: u32,

    /// Per-model capability override; empty inherits the provider set
    #[serde(default)]
    pub capabilities: HashSet<Capability>,

    /// Per-model price override; `None` inherits the provider table
    #[serde(default)]
    pub price: Option<PriceTable>,
}

impl ModelSpec {
    /// Create a model spec with defaults for the sizing fields.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            context_window: 8192,
            max_output_tokens: 2048,
            capabilities: HashSet::new(),
            price: None,
        }
    }

    /// Override the model's capability set.
    #[must_use]
    pub fn with_capabilities<I, C>(mut self, caps: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Capability>,
    {
        self.capabilities = caps.into_iter().map(Into::into).collect();
        self
    }

    /// Override the model's price table.
    #[must_use]
    pub fn with_price(mut self, price: PriceTable) -> Self {
        self.price = Some(price);
        self
    }
}

/// A registered provider and its models.
///
/// Immutable once loaded into a catalog snapshot; updates replace the whole
/// provider entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provider {
    /// Provider identifier
    pub id: String,

    /// Human-readable name
    pub display_name: String,

    /// Deployment region
    pub region: Region,

    /// Capabilities offered by default across the provider's models
    pub capabilities: HashSet<Capability>,

    /// Supported languages (ISO 639-1 codes), in no particular order
    pub languages: Vec<String>,

    /// Default price table for models without an override
    pub price: PriceTable,

    /// Registered models
    pub models: Vec<ModelSpec>,

    /// Disabled providers stay in the catalog but produce no candidates
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Provider {
    /// Create a provider with an empty model list.
    pub fn new(id: impl Into<String>, region: Region) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            region,
            capabilities: HashSet::new(),
            languages: Vec::new(),
            price: PriceTable::free(),
            models: Vec::new(),
            enabled: true,
        }
    }

    /// Set the provider-wide capability set.
    #[must_use]
    pub fn with_capabilities<I, C>(mut self, caps: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Capability>,
    {
        self.capabilities = caps.into_iter().map(Into::into).collect();
        self
    }

    /// Set the supported languages.
    #[must_use]
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default price table.
    #[must_use]
    pub fn with_price(mut self, price: PriceTable) -> Self {
        self.price = price;
        self
    }

    /// Register a model.
    #[must_use]
    pub fn with_model(mut self, model: ModelSpec) -> Self {
        self.models.push(model);
        self
    }

    /// Whether the provider supports at least one of the requested languages.
    /// An empty request list means no language constraint.
    #[must_use]
    pub fn supports_any_language(&self, requested: &[String]) -> bool {
        requested.is_empty() || requested.iter().any(|l| self.languages.contains(l))
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// One routable provider×model pair, resolved against a catalog snapshot.
#[derive(Clone, Debug)]
pub struct Candidate {
    /// The provider, shared with the snapshot it came from
    pub provider: Arc<Provider>,

    /// Index of the model within `provider.models`
    model_index: usize,
}

impl Candidate {
    /// The model spec.
    #[must_use]
    pub fn model(&self) -> &ModelSpec {
        &self.provider.models[self.model_index]
    }

    /// The model id.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model().id
    }

    /// Effective capabilities: the model override when present, otherwise
    /// the provider set.
    #[must_use]
    pub fn capabilities(&self) -> &HashSet<Capability> {
        let model = self.model();
        if model.capabilities.is_empty() {
            &self.provider.capabilities
        } else {
            &model.capabilities
        }
    }

    /// Effective price table: the model override when present, otherwise the
    /// provider table.
    #[must_use]
    pub fn price(&self) -> &PriceTable {
        self.model().price.as_ref().unwrap_or(&self.provider.price)
    }

    /// Deployment region of the serving provider.
    #[must_use]
    pub fn region(&self) -> Region {
        self.provider.region
    }

    /// Whether this pair satisfies every required capability.
    #[must_use]
    pub fn satisfies(&self, required: &HashSet<Capability>) -> bool {
        required.iter().all(|c| self.capabilities().contains(c))
    }
}

// ============================================================================
// Provider Registry
// ============================================================================

type Catalog = Arc<Vec<Arc<Provider>>>;

/// The provider catalog with atomic snapshot semantics.
///
/// Readers clone the current `Arc` and work against a frozen catalog;
/// writers build a replacement vector and swap it in. A routing cycle never
/// sees a provider half-updated.
pub struct ProviderRegistry {
    catalog: RwLock<Catalog>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Register a provider, replacing any existing entry with the same id.
    pub fn register(&self, provider: Provider) {
        let provider = Arc::new(provider);
        let mut guard = self.catalog.write();
        let mut next: Vec<Arc<Provider>> = guard
            .iter()
            .filter(|p| p.id != provider.id)
            .cloned()
            .collect();
        tracing::info!(
            provider = %provider.id,
            region = ?provider.region,
            models = provider.models.len(),
            "provider registered"
        );
        next.push(provider);
        *guard = Arc::new(next);
    }

    /// Remove a provider. Returns whether an entry was removed.
    pub fn deregister(&self, provider_id: &str) -> bool {
        let mut guard = self.catalog.write();
        let before = guard.len();
        let next: Vec<Arc<Provider>> = guard
            .iter()
            .filter(|p| p.id != provider_id)
            .cloned()
            .collect();
        let removed = next.len() < before;
        if removed {
            tracing::info!(provider = %provider_id, "provider deregistered");
            *guard = Arc::new(next);
        }
        removed
    }

    /// The current catalog snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Catalog {
        self.catalog.read().clone()
    }

    /// Look up a provider by id.
    #[must_use]
    pub fn get(&self, provider_id: &str) -> Option<Arc<Provider>> {
        self.snapshot().iter().find(|p| p.id == provider_id).cloned()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// List every enabled provider×model pair satisfying all required
    /// capabilities and at least one requested language.
    ///
    /// Returns an empty set when nothing matches — never an error.
    #[must_use]
    pub fn list_candidates(
        &self,
        required: &HashSet<Capability>,
        languages: &[String],
    ) -> Vec<Candidate> {
        let snapshot = self.snapshot();
        let mut candidates = Vec::new();

        for provider in snapshot.iter() {
            if !provider.enabled || !provider.supports_any_language(languages) {
                continue;
            }
            for model_index in 0..provider.models.len() {
                let candidate = Candidate {
                    provider: provider.clone(),
                    model_index,
                };
                if candidate.satisfies(required) {
                    candidates.push(candidate);
                }
            }
        }

        candidates
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
