// SPDX-License-Identifier: MIT

//! Expense reconciliation engine.
//!
//! Runs once per session close (and on explicit re-runs):
//! 1. Gather the user's COMPLETED visits and derive the business window
//!    from their earliest check-in and latest check-out.
//! 2. Fetch the session's GPS trail within that window.
//! 3. Walk consecutive sample pairs, filtering on accuracy and time gap,
//!    and sum the surviving segment distances.
//! 4. Classify the result: auto-submitted, or flagged for manual review
//!    with the violated thresholds spelled out.
//!
//! Re-running overwrites the prior claim's derived fields in place; a claim
//! that has already received a terminal manager decision is never recomputed.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::geo::{haversine_km, Coord};
use crate::models::{ClaimStatus, ExpenseClaim, ExpensePolicy, LocationPoint, VisitEventType};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Engine that turns a closed session's trail into an expense claim.
#[derive(Clone)]
pub struct ExpenseService {
    db: Db,
}

/// Outcome of the pure distance calculation over a point window.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimComputation {
    pub km_claimed: f64,
    pub amount_claimed: f64,
    pub status: ClaimStatus,
    pub exception_reason: Option<String>,
    pub valid_segments: u32,
}

/// Business window derived from visit check-in/check-out events.
#[derive(Debug, Default, Clone)]
struct BusinessWindow {
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
    first_visit_id: Option<Uuid>,
    last_visit_id: Option<Uuid>,
}

impl ExpenseService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Recompute the expense claim for a session. Idempotent: the session's
    /// single claim row is updated in place on re-runs.
    pub fn reconcile_session(&self, session_id: Uuid) -> Result<ExpenseClaim> {
        let session = self
            .db
            .get_session(session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;

        // Once a manager has acted, the derived fields are frozen.
        if let Some(existing) = self.db.get_claim_for_session(session_id) {
            if existing.status.is_finalized() {
                return Err(AppError::InvalidTransition(format!(
                    "Claim for session {} is already {:?} and cannot be recomputed",
                    session_id, existing.status
                )));
            }
        }

        let policy = self
            .db
            .active_policy()
            .ok_or_else(|| AppError::NotFound("No active expense policy".to_string()))?;

        // Completed visits are gathered user-globally, not session-scoped.
        let visits = self.db.completed_visits_for_user(session.user_id);
        let window = self.business_window(&visits);

        let points = match (window.start_at, window.end_at) {
            (Some(start), Some(end)) => self.db.points_in_range(session_id, start, end),
            _ => Vec::new(),
        };

        let computation = compute_claim(&points, &policy);

        tracing::info!(
            session_id = %session_id,
            km_claimed = computation.km_claimed,
            valid_segments = computation.valid_segments,
            status = ?computation.status,
            "Reconciled session trail"
        );

        let existing = self.db.get_claim_for_session(session_id);
        let claim = ExpenseClaim {
            id: existing.as_ref().map(|c| c.id).unwrap_or_else(Uuid::new_v4),
            user_id: session.user_id,
            session_id,
            policy_id: policy.id,
            first_business_visit_id: window.first_visit_id,
            last_business_visit_id: window.last_visit_id,
            business_start_at: window.start_at,
            business_end_at: window.end_at,
            km_claimed: computation.km_claimed,
            amount_claimed: computation.amount_claimed,
            // Approval fields belong to the workflow, never to the engine.
            km_approved: existing.as_ref().map(|c| c.km_approved).unwrap_or(0.0),
            amount_approved: existing.as_ref().map(|c| c.amount_approved).unwrap_or(0.0),
            status: computation.status,
            exception_reason: computation.exception_reason,
            created_at: existing
                .as_ref()
                .map(|c| c.created_at)
                .unwrap_or_else(Utc::now),
        };

        Ok(self.db.upsert_claim(claim))
    }

    /// Earliest CHECK_IN and latest CHECK_OUT across the given visits,
    /// tracking which visit contributed each bound.
    fn business_window(&self, visits: &[crate::models::Visit]) -> BusinessWindow {
        let mut window = BusinessWindow::default();

        for visit in visits {
            for event in self.db.events_for_visit(visit.id) {
                match event.event_type {
                    VisitEventType::CheckIn => {
                        if window.start_at.is_none_or(|t| event.event_at < t) {
                            window.start_at = Some(event.event_at);
                            window.first_visit_id = Some(visit.id);
                        }
                    }
                    VisitEventType::CheckOut => {
                        if window.end_at.is_none_or(|t| event.event_at > t) {
                            window.end_at = Some(event.event_at);
                            window.last_visit_id = Some(visit.id);
                        }
                    }
                    _ => {}
                }
            }
        }

        window
    }
}

/// Round to two decimal places, the precision persisted on claims.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sum the trail distance over a time-ordered point window and classify
/// the result against the policy thresholds.
///
/// Pure and synchronous; see the module docs for the filtering rules.
pub fn compute_claim(points: &[LocationPoint], policy: &ExpensePolicy) -> ClaimComputation {
    if points.len() < 2 {
        return ClaimComputation {
            km_claimed: 0.0,
            amount_claimed: 0.0,
            status: ClaimStatus::NeedsApproval,
            exception_reason: Some("Insufficient GPS data points (less than 2 points)".to_string()),
            valid_segments: 0,
        };
    }

    let mut total_km = 0.0;
    let mut valid_segments: u32 = 0;
    let mut has_sparse_gaps = false;

    for pair in points.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);

        // Absent accuracy is treated as perfect, matching the stored-data
        // convention of samples recorded before accuracy capture existed.
        let prev_acc = prev.accuracy_m.unwrap_or(0.0);
        let curr_acc = curr.accuracy_m.unwrap_or(0.0);
        if prev_acc > policy.min_accuracy_m || curr_acc > policy.min_accuracy_m {
            continue;
        }

        let gap_minutes = (curr.captured_at - prev.captured_at).num_milliseconds() as f64 / 60_000.0;
        if gap_minutes > policy.max_ping_gap_minutes {
            has_sparse_gaps = true;
            continue;
        }

        total_km += haversine_km(
            Coord::new(prev.lat, prev.lng),
            Coord::new(curr.lat, curr.lng),
        );
        valid_segments += 1;
    }

    let mut exceptions = Vec::new();
    if valid_segments < policy.min_valid_segments {
        exceptions.push(format!(
            "Only {} valid GPS segments (minimum {} required)",
            valid_segments, policy.min_valid_segments
        ));
    }
    if has_sparse_gaps {
        exceptions.push(format!(
            "GPS data has gaps exceeding {} minutes",
            policy.max_ping_gap_minutes
        ));
    }

    let (status, exception_reason) = if exceptions.is_empty() {
        (ClaimStatus::Submitted, None)
    } else {
        (ClaimStatus::NeedsApproval, Some(exceptions.join("; ")))
    };

    ClaimComputation {
        km_claimed: round2(total_km),
        amount_claimed: round2(total_km * policy.rate_per_km),
        status,
        exception_reason,
        valid_segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocationSource;
    use chrono::Duration;

    fn test_policy() -> ExpensePolicy {
        ExpensePolicy {
            id: Uuid::new_v4(),
            name: "Standard".to_string(),
            rate_per_km: 10.0,
            min_accuracy_m: 80.0,
            max_ping_gap_minutes: 10.0,
            min_valid_segments: 10,
            ping_interval_sec: 60,
            geofence_default_m: 150.0,
            effective_from: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            is_active: true,
        }
    }

    fn point(i: i64, lat: f64, accuracy_m: f64, at: DateTime<Utc>) -> LocationPoint {
        LocationPoint {
            id: i,
            session_id: Uuid::nil(),
            captured_at: at,
            lat,
            lng: 77.5946,
            accuracy_m: Some(accuracy_m),
            speed_mps: None,
            battery_pct: None,
            source: LocationSource::Ping,
        }
    }

    /// 11 clean samples at 2-minute spacing, each ~1 km further north.
    fn clean_trail() -> Vec<LocationPoint> {
        let t0 = Utc::now();
        (0..11)
            .map(|i| {
                point(
                    i,
                    // 0.009 degrees of latitude is ~1.0007 km
                    12.9716 + 0.009 * i as f64,
                    10.0,
                    t0 + Duration::minutes(2 * i),
                )
            })
            .collect()
    }

    #[test]
    fn test_fewer_than_two_points_needs_approval() {
        let policy = test_policy();

        for points in [Vec::new(), vec![point(1, 12.9716, 10.0, Utc::now())]] {
            let result = compute_claim(&points, &policy);
            assert_eq!(result.km_claimed, 0.0);
            assert_eq!(result.amount_claimed, 0.0);
            assert_eq!(result.status, ClaimStatus::NeedsApproval);
            assert!(result
                .exception_reason
                .as_deref()
                .unwrap()
                .contains("less than 2 points"));
        }
    }

    #[test]
    fn test_clean_trail_is_submitted() {
        let result = compute_claim(&clean_trail(), &test_policy());

        assert_eq!(result.valid_segments, 10);
        assert_eq!(result.status, ClaimStatus::Submitted);
        assert_eq!(result.exception_reason, None);
        // 10 segments of ~1 km each
        assert!((result.km_claimed - 10.0).abs() < 0.1, "{}", result.km_claimed);
        assert!((result.amount_claimed - result.km_claimed * 10.0).abs() < 0.01);
    }

    #[test]
    fn test_poor_accuracy_drops_segments_without_aborting() {
        let mut points = clean_trail();
        // One bad interior sample poisons the two segments touching it.
        points[5].accuracy_m = Some(100.0);

        let result = compute_claim(&points, &test_policy());

        assert_eq!(result.valid_segments, 8);
        assert_eq!(result.status, ClaimStatus::NeedsApproval);
        let reason = result.exception_reason.unwrap();
        assert!(
            reason.contains("Only 8 valid GPS segments (minimum 10 required)"),
            "{}",
            reason
        );
        // The scan kept going past the bad sample.
        assert!((result.km_claimed - 8.0).abs() < 0.1, "{}", result.km_claimed);
    }

    #[test]
    fn test_time_gap_flags_and_excludes_segment() {
        // 12 samples so that dropping the gap segment still leaves 10 valid.
        let t0 = Utc::now();
        let mut at = t0;
        let mut points = Vec::new();
        for i in 0..12 {
            // 15-minute jump between samples 5 and 6, 2 minutes elsewhere
            if i > 0 {
                at += if i == 6 {
                    Duration::minutes(15)
                } else {
                    Duration::minutes(2)
                };
            }
            points.push(point(i, 12.9716 + 0.009 * i as f64, 10.0, at));
        }

        let result = compute_claim(&points, &test_policy());

        assert_eq!(result.valid_segments, 10);
        assert_eq!(result.status, ClaimStatus::NeedsApproval);
        let reason = result.exception_reason.unwrap();
        assert!(reason.contains("GPS data has gaps exceeding 10 minutes"), "{}", reason);
        assert!(!reason.contains("valid GPS segments"), "{}", reason);
        // The gap segment's ~1 km is excluded from the total.
        assert!((result.km_claimed - 10.0).abs() < 0.1, "{}", result.km_claimed);
    }

    #[test]
    fn test_multiple_exceptions_joined() {
        let t0 = Utc::now();
        // Three samples with a 15-minute gap: 1 valid segment + gap flag.
        let points = vec![
            point(0, 12.9716, 10.0, t0),
            point(1, 12.9806, 10.0, t0 + Duration::minutes(2)),
            point(2, 12.9896, 10.0, t0 + Duration::minutes(17)),
        ];

        let result = compute_claim(&points, &test_policy());

        assert_eq!(result.status, ClaimStatus::NeedsApproval);
        let reason = result.exception_reason.unwrap();
        assert!(reason.contains("Only 1 valid GPS segments"), "{}", reason);
        assert!(reason.contains("; "), "{}", reason);
        assert!(reason.contains("gaps exceeding 10 minutes"), "{}", reason);
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        assert_eq!(round2(10.004999), 10.0);
        assert_eq!(round2(10.005001), 10.01);
        assert_eq!(round2(0.0), 0.0);
    }
}
