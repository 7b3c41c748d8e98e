// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use fieldtrack::config::Config;
use fieldtrack::db::Db;
use fieldtrack::middleware::auth::create_jwt;
use fieldtrack::models::{
    DutySession, ExpensePolicy, LocationPoint, LocationSource, SessionStatus, User, UserRole,
    Visit, VisitEvent, VisitEventType, VisitStatus, VisitType,
};
use fieldtrack::routes::create_router;
use fieldtrack::services::password::hash_password;
use fieldtrack::AppState;
use std::sync::Arc;
use uuid::Uuid;

/// Create a test app over a fresh in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = create_test_state();
    (create_router(state.clone()), state)
}

pub fn create_test_state() -> Arc<AppState> {
    Arc::new(AppState::new(Config::test_default(), Db::new()))
}

/// Insert a user with the given role; password is always "password1".
pub fn seed_user(db: &Db, role: UserRole) -> User {
    let id = Uuid::new_v4();
    db.insert_user(User {
        id,
        full_name: format!("Test {:?}", role),
        email: format!("{}@test.dev", id),
        password_hash: hash_password("password1").unwrap(),
        role,
        is_active: true,
        created_at: Utc::now(),
    })
}

/// Insert the standard active policy used across tests:
/// 10 per km, 80 m accuracy, 10 minute gap, 10 valid segments.
pub fn seed_policy(db: &Db) -> ExpensePolicy {
    db.insert_policy(ExpensePolicy {
        id: Uuid::new_v4(),
        name: "Standard".to_string(),
        rate_per_km: 10.0,
        min_accuracy_m: 80.0,
        max_ping_gap_minutes: 10.0,
        min_valid_segments: 10,
        ping_interval_sec: 60,
        geofence_default_m: 150.0,
        effective_from: Utc::now().date_naive(),
        is_active: true,
    })
}

#[allow(dead_code)]
pub fn token_for(state: &AppState, user: &User) -> String {
    create_jwt(user.id, user.role, &state.config.jwt_signing_key).unwrap()
}

/// Insert an OPEN session for the user with a given start time.
#[allow(dead_code)]
pub fn seed_open_session(db: &Db, user_id: Uuid, start_at: DateTime<Utc>) -> DutySession {
    let session = DutySession {
        id: Uuid::new_v4(),
        user_id,
        start_at,
        end_at: None,
        start_lat: 12.9716,
        start_lng: 77.5946,
        end_lat: None,
        end_lng: None,
        start_address_text: None,
        end_address_text: None,
        status: SessionStatus::Open,
        created_at: start_at,
    };
    assert!(db.insert_open_session(session.clone()));
    session
}

/// Insert a visit assigned to the user, in the given status.
#[allow(dead_code)]
pub fn seed_visit(db: &Db, user_id: Uuid, status: VisitStatus) -> Visit {
    db.insert_visit(Visit {
        id: Uuid::new_v4(),
        visit_type: VisitType::SiteVisit,
        created_by_user_id: user_id,
        assigned_to_user_id: user_id,
        assigned_by_user_id: None,
        title: "Site inspection".to_string(),
        purpose: None,
        planned_start_at: None,
        location_address_text: "12 MG Road".to_string(),
        location_lat: 12.9716,
        location_lng: 77.5946,
        geofence_radius_m: 150.0,
        status,
        created_at: Utc::now(),
    })
}

/// Append a CHECK_IN or CHECK_OUT event at a specific time.
#[allow(dead_code)]
pub fn seed_check_event(
    db: &Db,
    visit: &Visit,
    event_type: VisitEventType,
    event_at: DateTime<Utc>,
) -> VisitEvent {
    db.append_event(VisitEvent {
        id: Uuid::new_v4(),
        visit_id: visit.id,
        event_type,
        event_at,
        lat: Some(visit.location_lat),
        lng: Some(visit.location_lng),
        accuracy_m: Some(10.0),
        distance_to_target_m: Some(0.0),
        photo_url: None,
        note: None,
        created_by_user_id: visit.assigned_to_user_id,
    })
}

/// Append a trail sample at a specific time and latitude offset.
#[allow(dead_code)]
pub fn seed_point(
    db: &Db,
    session_id: Uuid,
    captured_at: DateTime<Utc>,
    lat: f64,
    accuracy_m: f64,
) -> LocationPoint {
    db.append_point(LocationPoint {
        id: 0,
        session_id,
        captured_at,
        lat,
        lng: 77.5946,
        accuracy_m: Some(accuracy_m),
        speed_mps: None,
        battery_pct: None,
        source: LocationSource::Ping,
    })
}
