// SPDX-License-Identifier: MIT

//! Concurrent in-memory store with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, email lookup)
//! - Duty sessions and their GPS trail
//! - Visits and their event log
//! - Expense policies, claims, approvals, and the audit log
//!
//! Cross-request invariants live here, at the persistence boundary:
//! - at most one OPEN session per user (`insert_open_session`)
//! - at most one expense claim per session (`upsert_claim`)
//!
//! Both are enforced with DashMap entry-API conditional inserts so that
//! concurrent duplicate requests (e.g. double day-start taps) cannot race.

use crate::models::{
    AuditLog, DutySession, ExpenseApproval, ExpenseClaim, ExpensePolicy, LocationPoint,
    SessionStatus, User, Visit, VisitEvent, VisitStatus,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: DashMap<Uuid, User>,
    users_by_email: DashMap<String, Uuid>,

    sessions: DashMap<Uuid, DutySession>,
    /// user id -> OPEN session id; presence means the user is on duty.
    open_sessions: DashMap<Uuid, Uuid>,

    /// session id -> trail, in insertion order.
    points: DashMap<Uuid, Vec<LocationPoint>>,
    point_seq: AtomicI64,

    visits: DashMap<Uuid, Visit>,
    /// visit id -> append-only event log.
    events: DashMap<Uuid, Vec<VisitEvent>>,

    policies: DashMap<Uuid, ExpensePolicy>,

    claims: DashMap<Uuid, ExpenseClaim>,
    /// session id -> claim id; guarantees one claim row per session.
    claims_by_session: DashMap<Uuid, Uuid>,

    /// claim id -> append-only approval records.
    approvals: DashMap<Uuid, Vec<ExpenseApproval>>,

    audit: DashMap<i64, AuditLog>,
    audit_seq: AtomicI64,
}

/// Shared in-memory database handle. Cheap to clone.
#[derive(Clone, Default)]
pub struct Db {
    inner: Arc<Inner>,
}

impl Db {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── User Operations ─────────────────────────────────────────

    pub fn insert_user(&self, user: User) -> User {
        self.inner
            .users_by_email
            .insert(user.email.to_lowercase(), user.id);
        self.inner.users.insert(user.id, user.clone());
        user
    }

    pub fn get_user(&self, id: Uuid) -> Option<User> {
        self.inner.users.get(&id).map(|u| u.clone())
    }

    pub fn get_user_by_email(&self, email: &str) -> Option<User> {
        let id = *self.inner.users_by_email.get(&email.to_lowercase())?;
        self.get_user(id)
    }

    // ─── Duty Session Operations ─────────────────────────────────

    /// Insert a new OPEN session for its user.
    ///
    /// Returns `false` without writing anything if the user already has an
    /// open session. This is the atomic check-then-create behind the
    /// one-open-session-per-user invariant.
    pub fn insert_open_session(&self, session: DutySession) -> bool {
        debug_assert_eq!(session.status, SessionStatus::Open);
        match self.inner.open_sessions.entry(session.user_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(session.id);
                self.inner.sessions.insert(session.id, session);
                true
            }
        }
    }

    pub fn get_session(&self, id: Uuid) -> Option<DutySession> {
        self.inner.sessions.get(&id).map(|s| s.clone())
    }

    pub fn open_session_for_user(&self, user_id: Uuid) -> Option<DutySession> {
        let id = *self.inner.open_sessions.get(&user_id)?;
        self.get_session(id)
    }

    /// Most recent session started today (UTC) for the user, open or closed.
    pub fn today_session_for_user(&self, user_id: Uuid) -> Option<DutySession> {
        let today = Utc::now().date_naive();
        self.inner
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.start_at.date_naive() == today)
            .max_by_key(|s| s.start_at)
            .map(|s| s.clone())
    }

    /// Persist a closed session and release the user's open-session slot.
    pub fn close_session(&self, session: DutySession) {
        debug_assert_eq!(session.status, SessionStatus::Closed);
        self.inner
            .open_sessions
            .remove_if(&session.user_id, |_, open_id| *open_id == session.id);
        self.inner.sessions.insert(session.id, session);
    }

    // ─── Location Point Operations ───────────────────────────────

    /// Append a sample to a session's trail, assigning its sequence id.
    pub fn append_point(&self, mut point: LocationPoint) -> LocationPoint {
        point.id = self.inner.point_seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner
            .points
            .entry(point.session_id)
            .or_default()
            .push(point.clone());
        point
    }

    /// All samples of a session ordered by capture time.
    pub fn points_for_session(&self, session_id: Uuid) -> Vec<LocationPoint> {
        let mut points = self
            .inner
            .points
            .get(&session_id)
            .map(|v| v.clone())
            .unwrap_or_default();
        points.sort_by_key(|p| p.captured_at);
        points
    }

    /// Samples of a session within `[start, end]` inclusive, ordered by
    /// capture time.
    pub fn points_in_range(
        &self,
        session_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<LocationPoint> {
        let mut points: Vec<LocationPoint> = self
            .inner
            .points
            .get(&session_id)
            .map(|v| v.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.captured_at >= start && p.captured_at <= end)
            .collect();
        points.sort_by_key(|p| p.captured_at);
        points
    }

    // ─── Visit Operations ────────────────────────────────────────

    pub fn insert_visit(&self, visit: Visit) -> Visit {
        self.inner.visits.insert(visit.id, visit.clone());
        visit
    }

    pub fn get_visit(&self, id: Uuid) -> Option<Visit> {
        self.inner.visits.get(&id).map(|v| v.clone())
    }

    pub fn update_visit(&self, visit: Visit) -> Visit {
        self.inner.visits.insert(visit.id, visit.clone());
        visit
    }

    /// Visits assigned to a user, ordered by planned start then creation.
    pub fn visits_for_user(&self, user_id: Uuid) -> Vec<Visit> {
        let mut visits: Vec<Visit> = self
            .inner
            .visits
            .iter()
            .filter(|v| v.assigned_to_user_id == user_id)
            .map(|v| v.clone())
            .collect();
        visits.sort_by_key(|v| (v.planned_start_at, v.created_at));
        visits
    }

    /// All COMPLETED visits for a user, regardless of session boundaries.
    pub fn completed_visits_for_user(&self, user_id: Uuid) -> Vec<Visit> {
        let mut visits: Vec<Visit> = self
            .inner
            .visits
            .iter()
            .filter(|v| v.assigned_to_user_id == user_id && v.status == VisitStatus::Completed)
            .map(|v| v.clone())
            .collect();
        visits.sort_by_key(|v| v.created_at);
        visits
    }

    // ─── Visit Event Operations ──────────────────────────────────

    pub fn append_event(&self, event: VisitEvent) -> VisitEvent {
        self.inner
            .events
            .entry(event.visit_id)
            .or_default()
            .push(event.clone());
        event
    }

    /// Event log of a visit ordered by event time.
    pub fn events_for_visit(&self, visit_id: Uuid) -> Vec<VisitEvent> {
        let mut events = self
            .inner
            .events
            .get(&visit_id)
            .map(|v| v.clone())
            .unwrap_or_default();
        events.sort_by_key(|e| e.event_at);
        events
    }

    // ─── Expense Policy Operations ───────────────────────────────

    pub fn insert_policy(&self, policy: ExpensePolicy) -> ExpensePolicy {
        self.inner.policies.insert(policy.id, policy.clone());
        policy
    }

    /// The active policy with the latest effective date, if any.
    pub fn active_policy(&self) -> Option<ExpensePolicy> {
        self.inner
            .policies
            .iter()
            .filter(|p| p.is_active)
            .max_by_key(|p| p.effective_from)
            .map(|p| p.clone())
    }

    // ─── Expense Claim Operations ────────────────────────────────

    /// Insert or replace the single claim for `claim.session_id`.
    ///
    /// If a claim already exists for the session, the incoming record takes
    /// over its id so no duplicate row can appear, even under concurrent
    /// reconciliation.
    pub fn upsert_claim(&self, mut claim: ExpenseClaim) -> ExpenseClaim {
        match self.inner.claims_by_session.entry(claim.session_id) {
            dashmap::mapref::entry::Entry::Occupied(slot) => {
                claim.id = *slot.get();
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(claim.id);
            }
        }
        self.inner.claims.insert(claim.id, claim.clone());
        claim
    }

    pub fn get_claim(&self, id: Uuid) -> Option<ExpenseClaim> {
        self.inner.claims.get(&id).map(|c| c.clone())
    }

    pub fn get_claim_for_session(&self, session_id: Uuid) -> Option<ExpenseClaim> {
        let id = *self.inner.claims_by_session.get(&session_id)?;
        self.get_claim(id)
    }

    /// Overwrite an existing claim (approval workflow only).
    pub fn update_claim(&self, claim: ExpenseClaim) -> ExpenseClaim {
        self.inner.claims.insert(claim.id, claim.clone());
        claim
    }

    pub fn claims_for_user(&self, user_id: Uuid) -> Vec<ExpenseClaim> {
        let mut claims: Vec<ExpenseClaim> = self
            .inner
            .claims
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.clone())
            .collect();
        claims.sort_by_key(|c| std::cmp::Reverse(c.created_at));
        claims
    }

    /// Claims awaiting a manager decision, newest first.
    pub fn pending_claims(&self) -> Vec<ExpenseClaim> {
        let mut claims: Vec<ExpenseClaim> = self
            .inner
            .claims
            .iter()
            .filter(|c| {
                matches!(
                    c.status,
                    crate::models::ClaimStatus::Submitted | crate::models::ClaimStatus::NeedsApproval
                )
            })
            .map(|c| c.clone())
            .collect();
        claims.sort_by_key(|c| std::cmp::Reverse(c.created_at));
        claims
    }

    // ─── Approval and Audit Operations ───────────────────────────

    pub fn append_approval(&self, approval: ExpenseApproval) -> ExpenseApproval {
        self.inner
            .approvals
            .entry(approval.claim_id)
            .or_default()
            .push(approval.clone());
        approval
    }

    pub fn approvals_for_claim(&self, claim_id: Uuid) -> Vec<ExpenseApproval> {
        self.inner
            .approvals
            .get(&claim_id)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn append_audit(&self, mut log: AuditLog) -> AuditLog {
        log.id = self.inner.audit_seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.audit.insert(log.id, log.clone());
        log
    }

    pub fn audit_for_entity(&self, entity_type: &str, entity_id: &str) -> Vec<AuditLog> {
        let mut logs: Vec<AuditLog> = self
            .inner
            .audit
            .iter()
            .filter(|l| l.entity_type == entity_type && l.entity_id == entity_id)
            .map(|l| l.clone())
            .collect();
        logs.sort_by_key(|l| l.id);
        logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStatus;

    fn session(user_id: Uuid) -> DutySession {
        DutySession {
            id: Uuid::new_v4(),
            user_id,
            start_at: Utc::now(),
            end_at: None,
            start_lat: 12.97,
            start_lng: 77.59,
            end_lat: None,
            end_lng: None,
            start_address_text: None,
            end_address_text: None,
            status: SessionStatus::Open,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_single_open_session_per_user() {
        let db = Db::new();
        let user = Uuid::new_v4();

        assert!(db.insert_open_session(session(user)));
        assert!(!db.insert_open_session(session(user)));

        // A different user is unaffected.
        assert!(db.insert_open_session(session(Uuid::new_v4())));
    }

    #[test]
    fn test_close_releases_open_slot() {
        let db = Db::new();
        let user = Uuid::new_v4();
        let mut s = session(user);
        assert!(db.insert_open_session(s.clone()));

        s.status = SessionStatus::Closed;
        s.end_at = Some(Utc::now());
        db.close_session(s);

        assert!(db.open_session_for_user(user).is_none());
        assert!(db.insert_open_session(session(user)));
    }

    #[test]
    fn test_upsert_claim_keeps_one_row_per_session() {
        let db = Db::new();
        let session_id = Uuid::new_v4();
        let make = || ExpenseClaim {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            session_id,
            policy_id: Uuid::new_v4(),
            first_business_visit_id: None,
            last_business_visit_id: None,
            business_start_at: None,
            business_end_at: None,
            km_claimed: 1.0,
            km_approved: 0.0,
            amount_claimed: 10.0,
            amount_approved: 0.0,
            status: crate::models::ClaimStatus::Submitted,
            exception_reason: None,
            created_at: Utc::now(),
        };

        let first = db.upsert_claim(make());
        let second = db.upsert_claim(make());

        assert_eq!(first.id, second.id);
        assert_eq!(db.get_claim_for_session(session_id).unwrap().id, first.id);
    }
}
