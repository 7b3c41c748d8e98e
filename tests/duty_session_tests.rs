// SPDX-License-Identifier: MIT

//! Duty session lifecycle tests.
//!
//! Exercise start/ping/end through the service layer against the in-memory
//! store, including the reconciliation trigger on session end.

use fieldtrack::error::AppError;
use fieldtrack::models::{ClaimStatus, LocationSource, SessionStatus, UserRole};
use fieldtrack::services::TrailSample;

mod common;

fn sample() -> TrailSample {
    TrailSample {
        lat: 12.9716,
        lng: 77.5946,
        accuracy_m: 10.0,
        speed_mps: None,
        battery_pct: Some(90),
    }
}

#[test]
fn test_start_records_initial_point() {
    let state = common::create_test_state();
    let user = common::seed_user(&state.db, UserRole::Sales);

    let session = state.duty_service.start_duty(user.id, sample(), None).unwrap();

    assert_eq!(session.status, SessionStatus::Open);
    let points = state.db.points_for_session(session.id);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].source, LocationSource::StartDay);
}

#[test]
fn test_second_open_session_rejected() {
    let state = common::create_test_state();
    let user = common::seed_user(&state.db, UserRole::Sales);

    state.duty_service.start_duty(user.id, sample(), None).unwrap();
    let err = state
        .duty_service
        .start_duty(user.id, sample(), None)
        .unwrap_err();

    assert!(matches!(err, AppError::SessionAlreadyOpen));
}

#[test]
fn test_ping_appends_trail_data() {
    let state = common::create_test_state();
    let user = common::seed_user(&state.db, UserRole::Sales);
    let session = state.duty_service.start_duty(user.id, sample(), None).unwrap();

    let point = state
        .duty_service
        .ping_duty(user.id, session.id, sample())
        .unwrap();

    assert_eq!(point.source, LocationSource::Ping);
    assert_eq!(state.db.points_for_session(session.id).len(), 2);
}

#[test]
fn test_ping_rejected_for_foreign_or_missing_session() {
    let state = common::create_test_state();
    let user = common::seed_user(&state.db, UserRole::Sales);
    let other = common::seed_user(&state.db, UserRole::Sales);
    let session = state.duty_service.start_duty(user.id, sample(), None).unwrap();

    let err = state
        .duty_service
        .ping_duty(other.id, session.id, sample())
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = state
        .duty_service
        .ping_duty(user.id, uuid::Uuid::new_v4(), sample())
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[test]
fn test_end_closes_session_and_generates_claim() {
    let state = common::create_test_state();
    common::seed_policy(&state.db);
    let user = common::seed_user(&state.db, UserRole::Sales);
    let session = state.duty_service.start_duty(user.id, sample(), None).unwrap();

    let closed = state
        .duty_service
        .end_duty(user.id, session.id, sample(), Some("Home".to_string()))
        .unwrap();

    assert_eq!(closed.status, SessionStatus::Closed);
    assert!(closed.end_at.is_some());

    let points = state.db.points_for_session(session.id);
    assert_eq!(points.last().unwrap().source, LocationSource::EndDay);

    // No completed visits: the claim exists with zero distance and an
    // insufficient-data exception.
    let claim = state.db.get_claim_for_session(session.id).unwrap();
    assert_eq!(claim.km_claimed, 0.0);
    assert_eq!(claim.status, ClaimStatus::NeedsApproval);
    assert!(claim
        .exception_reason
        .as_deref()
        .unwrap()
        .contains("less than 2 points"));
    assert!(claim.business_start_at.is_none());
    assert!(claim.business_end_at.is_none());
}

#[test]
fn test_end_twice_rejected() {
    let state = common::create_test_state();
    common::seed_policy(&state.db);
    let user = common::seed_user(&state.db, UserRole::Sales);
    let session = state.duty_service.start_duty(user.id, sample(), None).unwrap();

    state
        .duty_service
        .end_duty(user.id, session.id, sample(), None)
        .unwrap();
    let err = state
        .duty_service
        .end_duty(user.id, session.id, sample(), None)
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[test]
fn test_close_survives_reconciliation_failure() {
    // No active policy: reconciliation fails, the close must stand.
    let state = common::create_test_state();
    let user = common::seed_user(&state.db, UserRole::Sales);
    let session = state.duty_service.start_duty(user.id, sample(), None).unwrap();

    let closed = state
        .duty_service
        .end_duty(user.id, session.id, sample(), None)
        .unwrap();

    assert_eq!(closed.status, SessionStatus::Closed);
    assert!(state.db.get_claim_for_session(session.id).is_none());

    // The user can start a fresh session immediately.
    state.duty_service.start_duty(user.id, sample(), None).unwrap();
}
