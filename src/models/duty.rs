// SPDX-License-Identifier: MIT

//! Duty session and GPS trail models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a duty session. At most one OPEN session per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// One work period for a field user, from day-start to day-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DutySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_at: DateTime<Utc>,
    /// Set when the session is closed.
    pub end_at: Option<DateTime<Utc>>,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub start_address_text: Option<String>,
    pub end_address_text: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

/// What produced a location sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationSource {
    StartDay,
    Ping,
    CheckIn,
    CheckOut,
    EndDay,
}

/// Append-only GPS sample belonging to a session.
///
/// Never mutated or deleted; ordering by `captured_at` is the only
/// meaningful order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    pub id: i64,
    pub session_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    pub accuracy_m: Option<f64>,
    pub speed_mps: Option<f64>,
    pub battery_pct: Option<i32>,
    pub source: LocationSource,
}
