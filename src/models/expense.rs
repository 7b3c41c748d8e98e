// SPDX-License-Identifier: MIT

//! Expense policy, claim, and approval models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Versioned reconciliation thresholds. Exactly one policy is active at
/// reconciliation time; the policy used is recorded on the claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePolicy {
    pub id: Uuid,
    pub name: String,
    /// Currency amount claimed per kilometer.
    pub rate_per_km: f64,
    /// Samples with worse accuracy than this are excluded from segments.
    pub min_accuracy_m: f64,
    /// Segments spanning more than this are excluded and flagged as gaps.
    pub max_ping_gap_minutes: f64,
    /// Fewer valid segments than this forces manual review.
    pub min_valid_segments: u32,
    /// Recommended minimum interval between pings (advisory).
    pub ping_interval_sec: u32,
    pub geofence_default_m: f64,
    pub effective_from: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Draft,
    Submitted,
    NeedsApproval,
    Approved,
    Rejected,
}

impl ClaimStatus {
    /// A finalized claim has received a terminal manager decision; its
    /// derived fields must no longer be recomputed.
    pub fn is_finalized(self) -> bool {
        matches!(self, ClaimStatus::Approved | ClaimStatus::Rejected)
    }
}

/// One travel-expense claim per closed duty session.
///
/// Derived fields (`km_claimed`, `amount_claimed`, window bounds, status,
/// exception reason) are written only by the reconciliation engine; the
/// approval workflow mutates only status and the approved fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseClaim {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub policy_id: Uuid,
    pub first_business_visit_id: Option<Uuid>,
    pub last_business_visit_id: Option<Uuid>,
    pub business_start_at: Option<DateTime<Utc>>,
    pub business_end_at: Option<DateTime<Utc>>,
    pub km_claimed: f64,
    pub km_approved: f64,
    pub amount_claimed: f64,
    pub amount_approved: f64,
    pub status: ClaimStatus,
    /// Policy-threshold violations joined with "; ", None when clean.
    pub exception_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalAction {
    Approve,
    Reject,
    Adjust,
    RequestInfo,
}

/// Append-only record of one manager decision on a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseApproval {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub action: ApprovalAction,
    pub approved_by_user_id: Uuid,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
