// SPDX-License-Identifier: MIT

//! Visit lifecycle service.
//!
//! Enforces the PLANNED → IN_PROGRESS → COMPLETED state machine. Check-in
//! is gated by live accuracy and geofence checks, check-out by proof
//! completeness. Every transition is recorded as an immutable visit event,
//! and both check events also feed the user's open duty session trail.
//!
//! Accuracy and geofence checks run server-side only; client-reported
//! readings are advisory for UX but not trusted beyond this validation.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::geo::{self, Coord};
use crate::models::{
    LocationPoint, LocationSource, Visit, VisitEvent, VisitEventType, VisitStatus,
};
use chrono::Utc;
use uuid::Uuid;

/// Maximum accepted GPS accuracy for a check-in, in meters.
pub const MAX_CHECK_IN_ACCURACY_M: f64 = 80.0;

/// A GPS reading supplied with a check-in/check-out call.
#[derive(Debug, Clone, Copy)]
pub struct GpsReading {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_m: f64,
}

#[derive(Clone)]
pub struct VisitService {
    db: Db,
}

impl VisitService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Fetch a visit, verifying the caller is its assignee.
    fn assigned_visit(&self, actor_id: Uuid, visit_id: Uuid) -> Result<Visit> {
        let visit = self
            .db
            .get_visit(visit_id)
            .ok_or_else(|| AppError::NotFound(format!("Visit {} not found", visit_id)))?;
        if visit.assigned_to_user_id != actor_id {
            return Err(AppError::Forbidden(
                "Visit is assigned to another user".to_string(),
            ));
        }
        Ok(visit)
    }

    /// Check in to a PLANNED visit, transitioning it to IN_PROGRESS.
    pub fn check_in(&self, actor_id: Uuid, visit_id: Uuid, reading: GpsReading) -> Result<Visit> {
        let visit = self.assigned_visit(actor_id, visit_id)?;

        if visit.status != VisitStatus::Planned {
            return Err(AppError::InvalidTransition(format!(
                "Visit is {:?}, check-in requires PLANNED",
                visit.status
            )));
        }

        if reading.accuracy_m > MAX_CHECK_IN_ACCURACY_M {
            return Err(AppError::AccuracyTooLow {
                accuracy_m: reading.accuracy_m,
                max_m: MAX_CHECK_IN_ACCURACY_M,
            });
        }

        let user = Coord::new(reading.lat, reading.lng);
        let target = Coord::new(visit.location_lat, visit.location_lng);
        let distance_m = geo::distance_meters(user, target);
        if !geo::is_within_geofence(user, target, visit.geofence_radius_m) {
            return Err(AppError::OutsideGeofence {
                distance_m,
                radius_m: visit.geofence_radius_m,
            });
        }

        self.db.append_event(VisitEvent {
            id: Uuid::new_v4(),
            visit_id,
            event_type: VisitEventType::CheckIn,
            event_at: Utc::now(),
            lat: Some(reading.lat),
            lng: Some(reading.lng),
            accuracy_m: Some(reading.accuracy_m),
            distance_to_target_m: Some(distance_m),
            photo_url: None,
            note: None,
            created_by_user_id: actor_id,
        });

        let mut updated = visit;
        updated.status = VisitStatus::InProgress;
        let updated = self.db.update_visit(updated);

        self.ping_open_session(actor_id, reading, LocationSource::CheckIn);

        tracing::info!(visit_id = %visit_id, distance_m, "Checked in to visit");
        Ok(updated)
    }

    /// Check out of an IN_PROGRESS visit, transitioning it to COMPLETED.
    ///
    /// Requires at least one photo and one note among the visit's events;
    /// a note supplied inline with this call also counts.
    pub fn check_out(
        &self,
        actor_id: Uuid,
        visit_id: Uuid,
        reading: GpsReading,
        note: Option<&str>,
    ) -> Result<Visit> {
        let visit = self.assigned_visit(actor_id, visit_id)?;

        if visit.status != VisitStatus::InProgress {
            return Err(AppError::InvalidTransition(format!(
                "Visit is {:?}, check-out requires IN_PROGRESS",
                visit.status
            )));
        }

        let inline_note = note.map(str::trim).filter(|n| !n.is_empty());
        let events = self.db.events_for_visit(visit_id);
        let has_photo = events
            .iter()
            .any(|e| e.event_type == VisitEventType::Photo && e.photo_url.is_some());
        let has_note = inline_note.is_some()
            || events
                .iter()
                .any(|e| e.event_type == VisitEventType::Note && e.note.is_some());

        if !has_photo || !has_note {
            return Err(AppError::ProofIncomplete);
        }

        let distance_m = geo::distance_meters(
            Coord::new(reading.lat, reading.lng),
            Coord::new(visit.location_lat, visit.location_lng),
        );

        self.db.append_event(VisitEvent {
            id: Uuid::new_v4(),
            visit_id,
            event_type: VisitEventType::CheckOut,
            event_at: Utc::now(),
            lat: Some(reading.lat),
            lng: Some(reading.lng),
            accuracy_m: Some(reading.accuracy_m),
            distance_to_target_m: Some(distance_m),
            photo_url: None,
            note: inline_note.map(str::to_string),
            created_by_user_id: actor_id,
        });

        let mut updated = visit;
        updated.status = VisitStatus::Completed;
        let updated = self.db.update_visit(updated);

        self.ping_open_session(actor_id, reading, LocationSource::CheckOut);

        tracing::info!(visit_id = %visit_id, "Checked out of visit");
        Ok(updated)
    }

    /// Attach a photo reference to an IN_PROGRESS visit.
    pub fn add_photo(&self, actor_id: Uuid, visit_id: Uuid, photo_url: &str) -> Result<VisitEvent> {
        let visit = self.assigned_visit(actor_id, visit_id)?;
        if visit.status != VisitStatus::InProgress {
            return Err(AppError::InvalidState(
                "Can only add photos during an active visit".to_string(),
            ));
        }

        Ok(self.db.append_event(VisitEvent {
            id: Uuid::new_v4(),
            visit_id,
            event_type: VisitEventType::Photo,
            event_at: Utc::now(),
            lat: None,
            lng: None,
            accuracy_m: None,
            distance_to_target_m: None,
            photo_url: Some(photo_url.to_string()),
            note: None,
            created_by_user_id: actor_id,
        }))
    }

    /// Attach a note to an IN_PROGRESS visit.
    pub fn add_note(&self, actor_id: Uuid, visit_id: Uuid, note: &str) -> Result<VisitEvent> {
        let visit = self.assigned_visit(actor_id, visit_id)?;
        if visit.status != VisitStatus::InProgress {
            return Err(AppError::InvalidState(
                "Can only add notes during an active visit".to_string(),
            ));
        }

        let note = note.trim();
        if note.is_empty() {
            return Err(AppError::BadRequest("Note text is required".to_string()));
        }

        Ok(self.db.append_event(VisitEvent {
            id: Uuid::new_v4(),
            visit_id,
            event_type: VisitEventType::Note,
            event_at: Utc::now(),
            lat: None,
            lng: None,
            accuracy_m: None,
            distance_to_target_m: None,
            photo_url: None,
            note: Some(note.to_string()),
            created_by_user_id: actor_id,
        }))
    }

    /// Visit with its full event trail, visible to the assignee or a manager.
    pub fn visit_with_events(
        &self,
        actor_id: Uuid,
        is_manager: bool,
        visit_id: Uuid,
    ) -> Result<(Visit, Vec<VisitEvent>)> {
        let visit = self
            .db
            .get_visit(visit_id)
            .ok_or_else(|| AppError::NotFound(format!("Visit {} not found", visit_id)))?;
        if visit.assigned_to_user_id != actor_id && !is_manager {
            return Err(AppError::Forbidden(
                "Visit is assigned to another user".to_string(),
            ));
        }
        let events = self.db.events_for_visit(visit_id);
        Ok((visit, events))
    }

    /// Cross-entity side effect of a check event: the reading also extends
    /// the user's open duty session trail, when one exists.
    fn ping_open_session(&self, user_id: Uuid, reading: GpsReading, source: LocationSource) {
        if let Some(session) = self.db.open_session_for_user(user_id) {
            self.db.append_point(LocationPoint {
                id: 0,
                session_id: session.id,
                captured_at: Utc::now(),
                lat: reading.lat,
                lng: reading.lng,
                accuracy_m: Some(reading.accuracy_m),
                speed_mps: None,
                battery_pct: None,
                source,
            });
        }
    }
}
