//! Cost Governor
//!
//! Owns every organization's spend state and the admission gate in front of
//! it. Spend moves through a reserve→commit/release protocol:
//!
//! ```text
//! admit() ──reserve──> [reserved] ──commit(actual)──> [committed spend]
//!                          │
//!                          └──release()/sweep──> headroom restored
//! ```
//!
//! The reserve step is the engine's single required atomic region: the limit
//! check and the reserved-counter increment happen under one per-org mutex,
//! so two concurrent requests can never both pass a check that only one
//! could satisfy. Organizations never share a lock.
//!
//! Counters roll over at UTC day/month boundaries; the rollover also clears
//! the emergency-stop latch. The latch itself is one-way within a day: once
//! committed spend reaches the emergency threshold, every admission for that
//! org fails until rollover or an explicit, logged operator clear.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alerts::{
    severity_for_utilization, AlertEvent, AlertSender, ClearedBy, LimitPeriod,
};

// ============================================================================
// Limits
// ============================================================================

/// Spend limits for one organization.
///
/// Applied as defaults when an org has no explicit override; updatable at
/// any time, effective for future admissions only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgLimits {
    /// Maximum committed + reserved spend per UTC day, in cents
    pub daily_limit_cents: u64,

    /// Maximum committed + reserved spend per UTC month, in cents
    pub monthly_limit_cents: u64,

    /// Maximum estimated cost of a single request, in cents
    pub per_request_limit_cents: u64,

    /// Daily warning threshold as a percentage of the daily limit
    pub daily_warning_threshold_pct: f64,

    /// Monthly warning threshold as a percentage of the monthly limit
    pub monthly_warning_threshold_pct: f64,

    /// Committed daily spend at which the emergency stop trips; stricter
    /// than the daily limit when set below it
    pub emergency_stop_threshold_cents: u64,
}

impl Default for OrgLimits {
    fn default() -> Self {
        Self {
            daily_limit_cents: 10_000,    // 100 EUR/day
            monthly_limit_cents: 250_000, // 2500 EUR/month
            per_request_limit_cents: 2_500,
            daily_warning_threshold_pct: 80.0,
            monthly_warning_threshold_pct: 80.0,
            emergency_stop_threshold_cents: 9_000,
        }
    }
}

/// Partial limits update; `None` fields keep their current value.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct OrgLimitsUpdate {
    /// New daily limit, if set
    pub daily_limit_cents: Option<u64>,
    /// New monthly limit, if set
    pub monthly_limit_cents: Option<u64>,
    /// New per-request limit, if set
    pub per_request_limit_cents: Option<u64>,
    /// New daily warning threshold, if set
    pub daily_warning_threshold_pct: Option<f64>,
    /// New monthly warning threshold, if set
    pub monthly_warning_threshold_pct: Option<f64>,
    /// New emergency-stop threshold, if set
    pub emergency_stop_threshold_cents: Option<u64>,
}

impl OrgLimitsUpdate {
    fn apply(&self, limits: &mut OrgLimits) {
        if let Some(v) = self.daily_limit_cents {
            limits.daily_limit_cents = v;
        }
        if let Some(v) = self.monthly_limit_cents {
            limits.monthly_limit_cents = v;
        }
        if let Some(v) = self.per_request_limit_cents {
            limits.per_request_limit_cents = v;
        }
        if let Some(v) = self.daily_warning_threshold_pct {
            limits.daily_warning_threshold_pct = v;
        }
        if let Some(v) = self.monthly_warning_threshold_pct {
            limits.monthly_warning_threshold_pct = v;
        }
        if let Some(v) = self.emergency_stop_threshold_cents {
            limits.emergency_stop_threshold_cents = v;
        }
    }
}

// ============================================================================
// Rejection
// ============================================================================

/// Why an admission was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RejectionReason {
    /// The org's emergency stop is latched; admissions halt until rollover
    /// or operator clear
    #[error("organization is emergency-stopped")]
    EmergencyStopped,

    /// The estimate alone exceeds the per-request limit
    #[error("estimated cost {estimated_cents}c exceeds per-request limit {limit_cents}c")]
    PerRequestLimitExceeded {
        /// Estimated cost of the request
        estimated_cents: u64,
        /// The per-request limit
        limit_cents: u64,
    },

    /// Committed + reserved spend leaves too little daily headroom
    #[error("estimated cost {estimated_cents}c exceeds remaining daily headroom {headroom_cents}c")]
    DailyLimitExceeded {
        /// Estimated cost of the request
        estimated_cents: u64,
        /// Remaining headroom under the daily limit
        headroom_cents: u64,
    },

    /// Committed + reserved spend leaves too little monthly headroom
    #[error(
        "estimated cost {estimated_cents}c exceeds remaining monthly headroom {headroom_cents}c"
    )]
    MonthlyLimitExceeded {
        /// Estimated cost of the request
        estimated_cents: u64,
        /// Remaining headroom under the monthly limit
        headroom_cents: u64,
    },

    /// The estimate exceeds the request's own cost ceiling
    /// (`budget_cents` / `max_cost_eur`); raised by the router, never by
    /// the governor
    #[error("estimated cost {estimated_cents}c exceeds request ceiling {ceiling_cents}c")]
    RequestCeilingExceeded {
        /// Estimated cost of the request
        estimated_cents: u64,
        /// The request-level ceiling
        ceiling_cents: u64,
    },
}

// ============================================================================
// Org State
// ============================================================================

/// Mutable per-org accounting, guarded by the account mutex.
struct OrgState {
    limits: OrgLimits,
    day: NaiveDate,
    month: (i32, u32),
    committed_today_cents: u64,
    committed_month_cents: u64,
    reserved_cents: u64,
    requests_today: u64,
    emergency_stopped: bool,
    emergency_stopped_at: Option<DateTime<Utc>>,
    daily_warning_fired: bool,
    monthly_warning_fired: bool,
}

impl OrgState {
    fn new(limits: OrgLimits, today: NaiveDate) -> Self {
        Self {
            limits,
            day: today,
            month: (today.year(), today.month()),
            committed_today_cents: 0,
            committed_month_cents: 0,
            reserved_cents: 0,
            requests_today: 0,
            emergency_stopped: false,
            emergency_stopped_at: None,
            daily_warning_fired: false,
            monthly_warning_fired: false,
        }
    }
}

struct OrgAccount {
    state: Mutex<OrgState>,
}

/// A provisional budget hold created at admission time.
#[derive(Clone, Debug)]
pub struct Reservation {
    /// The request holding the reservation
    pub request_id: String,

    /// Owning organization
    pub org_id: String,

    /// Provider the request was routed to
    pub provider_id: String,

    /// Reserved amount in cents
    pub cents: u64,

    /// When the reservation was created
    pub created_at: Instant,
}

/// Read-only view of an organization's usage state.
#[derive(Clone, Debug)]
pub struct OrgUsageSnapshot {
    /// Organization id
    pub org_id: String,

    /// Committed spend this UTC day, in cents
    pub spend_today_cents: u64,

    /// Committed spend this UTC month, in cents
    pub spend_month_cents: u64,

    /// Currently reserved (admitted, not yet committed) cents
    pub reserved_cents: u64,

    /// Requests admitted this UTC day
    pub request_count_24h: u64,

    /// Whether the emergency stop is latched
    pub emergency_stopped: bool,

    /// When the latch tripped, if it is latched
    pub emergency_stopped_at: Option<DateTime<Utc>>,

    /// The limits currently in force
    pub limits: OrgLimits,
}

/// Cross-org spend totals for system stats.
#[derive(Clone, Debug, Default)]
pub struct GovernorTotals {
    /// Committed daily spend summed across orgs, in cents
    pub total_daily_cents: u64,

    /// Committed monthly spend summed across orgs, in cents
    pub total_monthly_cents: u64,

    /// Number of orgs with state
    pub active_organizations: usize,

    /// Requests admitted today summed across orgs
    pub requests_24h: u64,
}

// ============================================================================
// Cost Governor
// ============================================================================

/// Per-organization spend accounting and admission control.
pub struct CostGovernor {
    accounts: DashMap<String, Arc<OrgAccount>>,
    reservations: DashMap<String, Reservation>,
    default_limits: OrgLimits,
    alerts: AlertSender,
}

impl CostGovernor {
    /// Create a governor with the given default limits and alert dispatch.
    #[must_use]
    pub fn new(default_limits: OrgLimits, alerts: AlertSender) -> Self {
        Self {
            accounts: DashMap::new(),
            reservations: DashMap::new(),
            default_limits,
            alerts,
        }
    }

    fn account(&self, org_id: &str) -> Arc<OrgAccount> {
        self.accounts
            .entry(org_id.to_string())
            .or_insert_with(|| {
                Arc::new(OrgAccount {
                    state: Mutex::new(OrgState::new(
                        self.default_limits,
                        Utc::now().date_naive(),
                    )),
                })
            })
            .clone()
    }

    /// Reset period counters when the UTC day or month advanced. The
    /// emergency latch clears with the day; reservations survive the
    /// boundary and are settled by commit/release/sweep.
    fn roll_over(&self, org_id: &str, state: &mut OrgState) {
        let today = Utc::now().date_naive();
        if state.day != today {
            if state.emergency_stopped {
                tracing::info!(org = %org_id, "daily rollover cleared emergency stop");
                self.alerts.emit(AlertEvent::EmergencyCleared {
                    org_id: org_id.to_string(),
                    cleared_by: ClearedBy::Rollover,
                    at: Utc::now(),
                });
            }
            state.day = today;
            state.committed_today_cents = 0;
            state.requests_today = 0;
            state.daily_warning_fired = false;
            state.emergency_stopped = false;
            state.emergency_stopped_at = None;
        }
        let month = (today.year(), today.month());
        if state.month != month {
            state.month = month;
            state.committed_month_cents = 0;
            state.monthly_warning_fired = false;
        }
    }

    /// Atomically check limits and reserve `estimated_cents` for a request.
    ///
    /// The check and the reserved-counter increment happen under the org's
    /// mutex — concurrent requests against the same org cannot both consume
    /// headroom that only one of them fits into.
    ///
    /// # Errors
    ///
    /// Returns the first failed gate as a [`RejectionReason`]; no state
    /// changes on rejection.
    pub fn admit(
        &self,
        org_id: &str,
        request_id: &str,
        provider_id: &str,
        estimated_cents: u64,
    ) -> Result<(), RejectionReason> {
        let account = self.account(org_id);
        {
            let mut state = account.state.lock();
            self.roll_over(org_id, &mut state);

            if state.emergency_stopped {
                return Err(RejectionReason::EmergencyStopped);
            }
            if estimated_cents > state.limits.per_request_limit_cents {
                return Err(RejectionReason::PerRequestLimitExceeded {
                    estimated_cents,
                    limit_cents: state.limits.per_request_limit_cents,
                });
            }

            let daily_used = state.committed_today_cents + state.reserved_cents;
            if daily_used + estimated_cents > state.limits.daily_limit_cents {
                return Err(RejectionReason::DailyLimitExceeded {
                    estimated_cents,
                    headroom_cents: state.limits.daily_limit_cents.saturating_sub(daily_used),
                });
            }

            let monthly_used = state.committed_month_cents + state.reserved_cents;
            if monthly_used + estimated_cents > state.limits.monthly_limit_cents {
                return Err(RejectionReason::MonthlyLimitExceeded {
                    estimated_cents,
                    headroom_cents: state
                        .limits
                        .monthly_limit_cents
                        .saturating_sub(monthly_used),
                });
            }

            state.reserved_cents += estimated_cents;
            state.requests_today += 1;
        }

        let previous = self.reservations.insert(
            request_id.to_string(),
            Reservation {
                request_id: request_id.to_string(),
                org_id: org_id.to_string(),
                provider_id: provider_id.to_string(),
                cents: estimated_cents,
                created_at: Instant::now(),
            },
        );
        if let Some(previous) = previous {
            // A reused request id would leak its earlier hold
            tracing::warn!(
                request = %request_id,
                org = %org_id,
                "duplicate reservation replaced, releasing earlier hold"
            );
            let mut state = account.state.lock();
            state.reserved_cents = state.reserved_cents.saturating_sub(previous.cents);
        }

        tracing::debug!(
            request = %request_id,
            org = %org_id,
            provider = %provider_id,
            reserved_cents = estimated_cents,
            "admission granted"
        );
        Ok(())
    }

    /// Commit a reservation at its actual cost, which may differ from the
    /// estimate. Returns the settled reservation, or `None` for an unknown
    /// request id.
    pub fn commit(&self, request_id: &str, actual_cents: u64) -> Option<Reservation> {
        let (_, reservation) = self.reservations.remove(request_id)?;
        let account = self.account(&reservation.org_id);
        let mut state = account.state.lock();
        self.roll_over(&reservation.org_id, &mut state);

        state.reserved_cents = state.reserved_cents.saturating_sub(reservation.cents);
        state.committed_today_cents += actual_cents;
        state.committed_month_cents += actual_cents;

        self.check_thresholds(&reservation.org_id, &mut state);

        tracing::debug!(
            request = %request_id,
            org = %reservation.org_id,
            reserved_cents = reservation.cents,
            actual_cents,
            "reservation committed"
        );
        Some(reservation)
    }

    /// Release a reservation back to headroom without committing spend.
    /// Returns the released reservation, or `None` for an unknown id.
    pub fn release(&self, request_id: &str) -> Option<Reservation> {
        let (_, reservation) = self.reservations.remove(request_id)?;
        let account = self.account(&reservation.org_id);
        let mut state = account.state.lock();
        self.roll_over(&reservation.org_id, &mut state);
        state.reserved_cents = state.reserved_cents.saturating_sub(reservation.cents);

        tracing::debug!(
            request = %request_id,
            org = %reservation.org_id,
            released_cents = reservation.cents,
            "reservation released"
        );
        Some(reservation)
    }

    /// Fire warning/emergency events crossed by the latest commit. Warnings
    /// fire at most once per period; the fired flags reset at rollover.
    fn check_thresholds(&self, org_id: &str, state: &mut OrgState) {
        let limits = state.limits;

        if !state.daily_warning_fired && limits.daily_limit_cents > 0 {
            let pct =
                state.committed_today_cents as f64 * 100.0 / limits.daily_limit_cents as f64;
            if pct >= limits.daily_warning_threshold_pct {
                state.daily_warning_fired = true;
                tracing::info!(org = %org_id, utilization_pct = pct, "daily budget warning");
                self.alerts.emit(AlertEvent::BudgetWarning {
                    org_id: org_id.to_string(),
                    period: LimitPeriod::Daily,
                    utilization_pct: pct,
                    committed_cents: state.committed_today_cents,
                    limit_cents: limits.daily_limit_cents,
                    severity: severity_for_utilization(pct),
                    at: Utc::now(),
                });
            }
        }

        if !state.monthly_warning_fired && limits.monthly_limit_cents > 0 {
            let pct =
                state.committed_month_cents as f64 * 100.0 / limits.monthly_limit_cents as f64;
            if pct >= limits.monthly_warning_threshold_pct {
                state.monthly_warning_fired = true;
                tracing::info!(org = %org_id, utilization_pct = pct, "monthly budget warning");
                self.alerts.emit(AlertEvent::BudgetWarning {
                    org_id: org_id.to_string(),
                    period: LimitPeriod::Monthly,
                    utilization_pct: pct,
                    committed_cents: state.committed_month_cents,
                    limit_cents: limits.monthly_limit_cents,
                    severity: severity_for_utilization(pct),
                    at: Utc::now(),
                });
            }
        }

        if !state.emergency_stopped
            && limits.emergency_stop_threshold_cents > 0
            && state.committed_today_cents >= limits.emergency_stop_threshold_cents
        {
            state.emergency_stopped = true;
            state.emergency_stopped_at = Some(Utc::now());
            tracing::warn!(
                org = %org_id,
                committed_cents = state.committed_today_cents,
                threshold_cents = limits.emergency_stop_threshold_cents,
                "emergency stop tripped, admissions halted"
            );
            self.alerts.emit(AlertEvent::EmergencyStop {
                org_id: org_id.to_string(),
                committed_cents: state.committed_today_cents,
                threshold_cents: limits.emergency_stop_threshold_cents,
                at: Utc::now(),
            });
        }
    }

    /// Release reservations older than `max_age`. Backstop against callers
    /// that abandoned a request without reporting completion.
    pub fn sweep_expired_reservations(&self, max_age: Duration) -> usize {
        let expired: Vec<String> = self
            .reservations
            .iter()
            .filter(|entry| entry.value().created_at.elapsed() > max_age)
            .map(|entry| entry.key().clone())
            .collect();

        let mut swept = 0;
        for request_id in expired {
            if let Some(reservation) = self.release(&request_id) {
                tracing::warn!(
                    request = %request_id,
                    org = %reservation.org_id,
                    cents = reservation.cents,
                    "expired reservation swept"
                );
                swept += 1;
            }
        }
        swept
    }

    /// Usage snapshot for an org, `None` if it never made a request.
    #[must_use]
    pub fn usage(&self, org_id: &str) -> Option<OrgUsageSnapshot> {
        let account = self.accounts.get(org_id)?.clone();
        let mut state = account.state.lock();
        self.roll_over(org_id, &mut state);
        Some(OrgUsageSnapshot {
            org_id: org_id.to_string(),
            spend_today_cents: state.committed_today_cents,
            spend_month_cents: state.committed_month_cents,
            reserved_cents: state.reserved_cents,
            request_count_24h: state.requests_today,
            emergency_stopped: state.emergency_stopped,
            emergency_stopped_at: state.emergency_stopped_at,
            limits: state.limits,
        })
    }

    /// Merge a partial limits update; effective for future admissions only.
    pub fn update_limits(&self, org_id: &str, update: OrgLimitsUpdate) {
        let account = self.account(org_id);
        let mut state = account.state.lock();
        update.apply(&mut state.limits);
        tracing::info!(org = %org_id, limits = ?state.limits, "organization limits updated");
    }

    /// Explicitly lift an emergency stop. Operator actions are logged.
    /// Returns whether a latch was actually cleared.
    pub fn clear_emergency_stop(&self, org_id: &str, operator: &str) -> bool {
        let Some(account) = self.accounts.get(org_id).map(|a| a.clone()) else {
            return false;
        };
        let mut state = account.state.lock();
        if !state.emergency_stopped {
            return false;
        }
        state.emergency_stopped = false;
        state.emergency_stopped_at = None;
        tracing::warn!(org = %org_id, operator = %operator, "emergency stop cleared by operator");
        self.alerts.emit(AlertEvent::EmergencyCleared {
            org_id: org_id.to_string(),
            cleared_by: ClearedBy::Operator(operator.to_string()),
            at: Utc::now(),
        });
        true
    }

    /// Cross-org committed totals (rollover applied per account).
    #[must_use]
    pub fn totals(&self) -> GovernorTotals {
        let mut totals = GovernorTotals::default();
        for entry in self.accounts.iter() {
            let account = entry.value().clone();
            let mut state = account.state.lock();
            self.roll_over(entry.key(), &mut state);
            totals.total_daily_cents += state.committed_today_cents;
            totals.total_monthly_cents += state.committed_month_cents;
            totals.requests_24h += state.requests_today;
            totals.active_organizations += 1;
        }
        totals
    }

    /// Number of reservations currently held.
    #[must_use]
    pub fn active_reservations(&self) -> usize {
        self.reservations.len()
    }

    /// Rewind an org's accounting period (for testing/admin). Counters are
    /// left untouched; the next access rolls them over if the real date
    /// differs.
    pub fn force_period(&self, org_id: &str, day: NaiveDate) {
        let account = self.account(org_id);
        let mut state = account.state.lock();
        state.day = day;
        state.month = (day.year(), day.month());
    }
}

// ============================================================================
// Tests
// ============================================================================
