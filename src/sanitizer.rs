//! Content Sanitizer
//!
//! The last gate before request content leaves the trust boundary. The gate
//! runs after routing because the policy depends on where the content is
//! going, not just what it is: confidential or PII content bound for a
//! cloud-region provider has detectable sensitive spans replaced with stable
//! tags; content bound for an edge provider, or content below the
//! sensitivity bar, passes through unchanged.
//!
//! Validation is fail-safe at the pattern level — a span matching any PII
//! pattern is redacted even when that produces a false positive.

use std::sync::LazyLock;

use regex::Regex;

use crate::registry::Region;
use crate::request::AIRequest;
use crate::router::RoutingDecision;

// ============================================================================
// PII Patterns
// ============================================================================

// Pattern order matters: IBAN and card numbers are matched before phone
// numbers so digit runs are claimed by the most specific pattern first.

static IBAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]{2}\d{2}[A-Z0-9]{11,30}\b").expect("iban pattern")
});

static CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{1,4}\b").expect("card pattern")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+\d{1,3}[ .-]?\(?\d{1,4}\)?(?:[ .-]?\d{2,4}){2,4}").expect("phone pattern")
});

static PATTERNS: &[(&LazyLock<Regex>, &str)] = &[
    (&IBAN_RE, "[iban]"),
    (&CARD_RE, "[card]"),
    (&EMAIL_RE, "[email]"),
    (&PHONE_RE, "[phone]"),
];

// ============================================================================
// Sanitizer
// ============================================================================

/// Content after sanitization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizedContent {
    /// The (possibly redacted) content to hand to the provider transport
    pub content: String,

    /// Number of sensitive spans that were replaced
    pub redaction_count: usize,
}

/// Sensitivity-gated redaction of request content.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentSanitizer;

impl ContentSanitizer {
    /// Create a sanitizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Apply the redaction policy for a routed request.
    ///
    /// Redacts only when the request's sensitivity requires it *and* the
    /// chosen provider is cloud-region; otherwise the content passes through
    /// unchanged with a redaction count of zero.
    #[must_use]
    pub fn process(
        &self,
        content: &str,
        decision: &RoutingDecision,
        request: &AIRequest,
    ) -> SanitizedContent {
        if !request.sensitivity.requires_redaction() || decision.region == Region::Edge {
            return SanitizedContent {
                content: content.to_string(),
                redaction_count: 0,
            };
        }

        let sanitized = self.redact(content);
        if sanitized.redaction_count > 0 {
            tracing::info!(
                request = %request.request_id,
                org = %request.org_id,
                provider = %decision.provider_id,
                redactions = sanitized.redaction_count,
                "content redacted before leaving trust boundary"
            );
        }
        sanitized
    }

    /// Replace every detectable sensitive span, unconditionally.
    #[must_use]
    pub fn redact(&self, content: &str) -> SanitizedContent {
        let mut redaction_count = 0;
        let mut current = content.to_string();

        for (pattern, tag) in PATTERNS {
            let matches = pattern.find_iter(&current).count();
            if matches > 0 {
                redaction_count += matches;
                current = pattern.replace_all(&current, *tag).into_owned();
            }
        }

        SanitizedContent {
            content: current,
            redaction_count,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
