// SPDX-License-Identifier: MIT

//! Duty session tracker.
//!
//! Manages the open/closed lifecycle of a user's work day and ingestion of
//! periodic location pings. Ending a session synchronously triggers expense
//! reconciliation; a reconciliation failure is logged and never rolls back
//! the already-applied close.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{DutySession, LocationPoint, LocationSource, SessionStatus};
use crate::services::expense::ExpenseService;
use chrono::Utc;
use uuid::Uuid;

/// A GPS sample submitted by the mobile client.
#[derive(Debug, Clone, Copy)]
pub struct TrailSample {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_m: f64,
    pub speed_mps: Option<f64>,
    pub battery_pct: Option<i32>,
}

#[derive(Clone)]
pub struct DutyService {
    db: Db,
    expense: ExpenseService,
}

impl DutyService {
    pub fn new(db: Db, expense: ExpenseService) -> Self {
        Self { db, expense }
    }

    /// Open a duty session for the user and record the START_DAY sample.
    pub fn start_duty(
        &self,
        user_id: Uuid,
        sample: TrailSample,
        address_text: Option<String>,
    ) -> Result<DutySession> {
        let session = DutySession {
            id: Uuid::new_v4(),
            user_id,
            start_at: Utc::now(),
            end_at: None,
            start_lat: sample.lat,
            start_lng: sample.lng,
            end_lat: None,
            end_lng: None,
            start_address_text: address_text,
            end_address_text: None,
            status: SessionStatus::Open,
            created_at: Utc::now(),
        };

        // Atomic check-then-create at the store: a concurrent duplicate
        // day-start loses here rather than creating a second open session.
        if !self.db.insert_open_session(session.clone()) {
            return Err(AppError::SessionAlreadyOpen);
        }

        self.append_sample(session.id, sample, LocationSource::StartDay);

        tracing::info!(session_id = %session.id, user_id = %user_id, "Duty session started");
        Ok(session)
    }

    /// Append a PING sample to an open session owned by the caller.
    ///
    /// Pings are unconditional trail data: no geofence constraint applies,
    /// and rate limiting is a collaborator concern.
    pub fn ping_duty(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        sample: TrailSample,
    ) -> Result<LocationPoint> {
        let session = self.owned_session(user_id, session_id)?;
        if session.status != SessionStatus::Open {
            return Err(AppError::NotFound(
                "Session not found or closed".to_string(),
            ));
        }

        Ok(self.append_sample(session_id, sample, LocationSource::Ping))
    }

    /// Close an open session: record the END_DAY sample, mark it CLOSED,
    /// then trigger reconciliation best-effort.
    pub fn end_duty(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        sample: TrailSample,
        address_text: Option<String>,
    ) -> Result<DutySession> {
        let mut session = self.owned_session(user_id, session_id)?;
        if session.status != SessionStatus::Open {
            return Err(AppError::InvalidTransition(
                "Session is already closed".to_string(),
            ));
        }

        self.append_sample(session_id, sample, LocationSource::EndDay);

        session.status = SessionStatus::Closed;
        session.end_at = Some(Utc::now());
        session.end_lat = Some(sample.lat);
        session.end_lng = Some(sample.lng);
        session.end_address_text = address_text;
        self.db.close_session(session.clone());

        tracing::info!(session_id = %session_id, user_id = %user_id, "Duty session closed");

        // The day-end stands even when reconciliation fails; the claim is
        // absent or stale until reconciliation is retried.
        if let Err(err) = self.expense.reconcile_session(session_id) {
            tracing::warn!(
                session_id = %session_id,
                error = %err,
                "Expense reconciliation failed after session close"
            );
        }

        Ok(session)
    }

    fn owned_session(&self, user_id: Uuid, session_id: Uuid) -> Result<DutySession> {
        let session = self
            .db
            .get_session(session_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;
        if session.user_id != user_id {
            // Do not leak other users' session ids.
            return Err(AppError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        Ok(session)
    }

    fn append_sample(
        &self,
        session_id: Uuid,
        sample: TrailSample,
        source: LocationSource,
    ) -> LocationPoint {
        self.db.append_point(LocationPoint {
            id: 0,
            session_id,
            captured_at: Utc::now(),
            lat: sample.lat,
            lng: sample.lng,
            accuracy_m: Some(sample.accuracy_m),
            speed_mps: sample.speed_mps,
            battery_pct: sample.battery_pct,
            source,
        })
    }
}
