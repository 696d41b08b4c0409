//! Budget Alerts
//!
//! Events the cost governor raises toward the surrounding system: warning
//! thresholds crossed, emergency stops tripped and cleared. Delivery is
//! fire-and-forget over a bounded channel — a full or missing channel sheds
//! the event with a log line and never blocks or fails an admission
//! decision. Transporting the events (webhooks, email, chat) is the
//! consumer's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// ============================================================================
// Events
// ============================================================================

/// Which spend limit an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPeriod {
    /// The daily limit
    Daily,
    /// The monthly limit
    Monthly,
}

/// Severity of a budget alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational
    Low,
    /// Worth a look
    Medium,
    /// Action needed soon
    High,
    /// Spending has been halted
    Critical,
}

/// Grade a warning by utilization of the limit.
#[must_use]
pub fn severity_for_utilization(pct: f64) -> AlertSeverity {
    if pct >= 95.0 {
        AlertSeverity::High
    } else if pct >= 85.0 {
        AlertSeverity::Medium
    } else {
        AlertSeverity::Low
    }
}

/// How an emergency stop was lifted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearedBy {
    /// The daily rollover reset the latch
    Rollover,
    /// An operator cleared it explicitly
    Operator(String),
}

/// An event raised by the cost governor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AlertEvent {
    /// Committed spend crossed a warning threshold.
    BudgetWarning {
        /// Affected organization
        org_id: String,
        /// Which limit the warning refers to
        period: LimitPeriod,
        /// Committed spend as a percentage of the limit
        utilization_pct: f64,
        /// Committed spend in cents
        committed_cents: u64,
        /// The limit in cents
        limit_cents: u64,
        /// Graded severity
        severity: AlertSeverity,
        /// When the threshold was crossed
        at: DateTime<Utc>,
    },

    /// The emergency-stop threshold was reached; admissions are halted.
    EmergencyStop {
        /// Affected organization
        org_id: String,
        /// Committed spend when the latch tripped
        committed_cents: u64,
        /// The configured threshold in cents
        threshold_cents: u64,
        /// When the latch tripped
        at: DateTime<Utc>,
    },

    /// An emergency stop was lifted.
    EmergencyCleared {
        /// Affected organization
        org_id: String,
        /// What lifted it
        cleared_by: ClearedBy,
        /// When it was lifted
        at: DateTime<Utc>,
    },
}

impl AlertEvent {
    /// The organization the event concerns.
    #[must_use]
    pub fn org_id(&self) -> &str {
        match self {
            Self::BudgetWarning { org_id, .. }
            | Self::EmergencyStop { org_id, .. }
            | Self::EmergencyCleared { org_id, .. } => org_id,
        }
    }

    /// Severity of the event.
    #[must_use]
    pub fn severity(&self) -> AlertSeverity {
        match self {
            Self::BudgetWarning { severity, .. } => *severity,
            Self::EmergencyStop { .. } => AlertSeverity::Critical,
            Self::EmergencyCleared { .. } => AlertSeverity::Medium,
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Non-blocking alert dispatch handle.
///
/// Wraps an optional bounded sender; `emit` is `try_send` with shedding, so
/// the governor's critical sections stay O(1) regardless of consumer speed.
#[derive(Clone)]
pub struct AlertSender {
    tx: Option<mpsc::Sender<AlertEvent>>,
}

impl AlertSender {
    /// A sender that drops every event (alerting disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// A sender delivering into the given channel.
    #[must_use]
    pub fn new(tx: mpsc::Sender<AlertEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Emit an event without blocking. A full queue sheds the event; a
    /// closed or absent channel drops it silently.
    pub fn emit(&self, event: AlertEvent) {
        let Some(ref tx) = self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    org = %event.org_id(),
                    severity = ?event.severity(),
                    "alert channel full, shedding event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("alert channel closed, dropping event");
            }
        }
    }
}

impl std::fmt::Debug for AlertSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertSender")
            .field("enabled", &self.tx.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
