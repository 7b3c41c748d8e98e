// SPDX-License-Identifier: MIT

//! Visit and visit-event models.
//!
//! `Visit.status` is the state-machine variable; transitions happen only
//! through event creation in the visit service. The event list is the full
//! audit trail of a visit's lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitType {
    SalesMeeting,
    SiteVisit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

/// A planned or assigned field engagement with a geofenced target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: Uuid,
    pub visit_type: VisitType,
    pub created_by_user_id: Uuid,
    pub assigned_to_user_id: Uuid,
    pub assigned_by_user_id: Option<Uuid>,
    pub title: String,
    pub purpose: Option<String>,
    pub planned_start_at: Option<DateTime<Utc>>,
    pub location_address_text: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub geofence_radius_m: f64,
    pub status: VisitStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitEventType {
    CheckIn,
    CheckOut,
    Photo,
    Note,
    StatusChange,
}

/// Append-only proof/trace record tied to a visit. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitEvent {
    pub id: Uuid,
    pub visit_id: Uuid,
    pub event_type: VisitEventType,
    pub event_at: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub distance_to_target_m: Option<f64>,
    pub photo_url: Option<String>,
    pub note: Option<String>,
    pub created_by_user_id: Uuid,
}
