// SPDX-License-Identifier: MIT

//! API routes for authenticated users.
//!
//! Thin HTTP front over the domain services; request bodies are validated
//! here, all precondition checks live in the services.

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_manager, AuthUser};
use crate::models::{
    ApprovalAction, DutySession, ExpenseClaim, LocationPoint, Visit, VisitEvent, VisitStatus,
    VisitType,
};
use crate::services::{Decision, GpsReading, TrailSample};
use crate::AppState;
use axum::{
    extract::{Path, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    let manager_routes = Router::new()
        .route("/api/visits/assign", post(assign_visit))
        .route("/api/expenses/pending", get(pending_expenses))
        .route("/api/expenses/{id}/approve", post(approve_expense))
        .route("/api/expenses/{id}/reconcile", post(reconcile_expense))
        .route_layer(middleware::from_fn(require_manager));

    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/sessions/start", post(start_session))
        .route("/api/sessions/{id}/ping", post(ping_session))
        .route("/api/sessions/{id}/end", post(end_session))
        .route("/api/sessions/today", get(today_session))
        .route("/api/visits", get(list_visits).post(create_visit))
        .route("/api/visits/{id}", get(get_visit))
        .route("/api/visits/{id}/checkin", post(check_in))
        .route("/api/visits/{id}/checkout", post(check_out))
        .route("/api/visits/{id}/photo", post(add_photo))
        .route("/api/visits/{id}/note", post(add_note))
        .route("/api/expenses/mine", get(my_expenses))
        .merge(manager_routes)
}

fn validated<T: Validate>(body: T) -> Result<T> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(body)
}

// ─── User Profile ────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<crate::models::User>> {
    let profile = state
        .db
        .get_user(user.user_id)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;
    Ok(Json(profile))
}

// ─── Duty Sessions ───────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SessionSampleBody {
    #[validate(range(min = -90.0, max = 90.0))]
    lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    lng: f64,
    #[validate(range(min = 0.0))]
    accuracy_m: f64,
    speed_mps: Option<f64>,
    #[validate(range(min = 0, max = 100))]
    battery_pct: Option<i32>,
    address_text: Option<String>,
}

impl SessionSampleBody {
    fn sample(&self) -> TrailSample {
        TrailSample {
            lat: self.lat,
            lng: self.lng,
            accuracy_m: self.accuracy_m,
            speed_mps: self.speed_mps,
            battery_pct: self.battery_pct,
        }
    }
}

async fn start_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SessionSampleBody>,
) -> Result<Json<DutySession>> {
    let body = validated(body)?;
    let session = state
        .duty_service
        .start_duty(user.user_id, body.sample(), body.address_text.clone())?;
    Ok(Json(session))
}

async fn ping_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<SessionSampleBody>,
) -> Result<Json<LocationPoint>> {
    let body = validated(body)?;
    let point = state.duty_service.ping_duty(user.user_id, id, body.sample())?;
    Ok(Json(point))
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<SessionSampleBody>,
) -> Result<Json<DutySession>> {
    let body = validated(body)?;
    let session =
        state
            .duty_service
            .end_duty(user.user_id, id, body.sample(), body.address_text.clone())?;
    Ok(Json(session))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TodayResponse {
    session: Option<DutySession>,
    visits_today: Vec<Visit>,
    expense_claim: Option<ExpenseClaim>,
}

/// Today's session with its visits and claim, for the mobile home screen.
async fn today_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<TodayResponse>> {
    let session = state.db.today_session_for_user(user.user_id);
    let (visits_today, expense_claim) = match &session {
        Some(s) => (
            state.db.visits_for_user(user.user_id),
            state.db.get_claim_for_session(s.id),
        ),
        None => (Vec::new(), None),
    };
    Ok(Json(TodayResponse {
        session,
        visits_today,
        expense_claim,
    }))
}

// ─── Visits ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateVisitBody {
    visit_type: VisitType,
    #[validate(length(min = 1))]
    title: String,
    purpose: Option<String>,
    #[validate(length(min = 1))]
    location_address_text: String,
    #[validate(range(min = -90.0, max = 90.0))]
    location_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    location_lng: f64,
    planned_start_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1.0))]
    geofence_radius_m: Option<f64>,
}

/// Default geofence radius in meters when a visit does not set one.
const DEFAULT_GEOFENCE_RADIUS_M: f64 = 150.0;

fn build_visit(body: &CreateVisitBody, created_by: Uuid, assigned_to: Uuid) -> Visit {
    Visit {
        id: Uuid::new_v4(),
        visit_type: body.visit_type,
        created_by_user_id: created_by,
        assigned_to_user_id: assigned_to,
        assigned_by_user_id: (created_by != assigned_to).then_some(created_by),
        title: body.title.clone(),
        purpose: body.purpose.clone(),
        planned_start_at: body.planned_start_at,
        location_address_text: body.location_address_text.clone(),
        location_lat: body.location_lat,
        location_lng: body.location_lng,
        geofence_radius_m: body.geofence_radius_m.unwrap_or(DEFAULT_GEOFENCE_RADIUS_M),
        status: VisitStatus::Planned,
        created_at: Utc::now(),
    }
}

async fn create_visit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateVisitBody>,
) -> Result<Json<Visit>> {
    let body = validated(body)?;
    let visit = state
        .db
        .insert_visit(build_visit(&body, user.user_id, user.user_id));
    Ok(Json(visit))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct AssignVisitBody {
    assigned_to_user_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    visit: CreateVisitBody,
}

async fn assign_visit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<AssignVisitBody>,
) -> Result<Json<Visit>> {
    let body = validated(body)?;
    let assignee = state
        .db
        .get_user(body.assigned_to_user_id)
        .ok_or_else(|| AppError::NotFound("Assignee not found".to_string()))?;
    let visit = state
        .db
        .insert_visit(build_visit(&body.visit, user.user_id, assignee.id));
    Ok(Json(visit))
}

async fn list_visits(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Visit>>> {
    Ok(Json(state.db.visits_for_user(user.user_id)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VisitDetailResponse {
    visit: Visit,
    events: Vec<VisitEvent>,
}

async fn get_visit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitDetailResponse>> {
    let (visit, events) =
        state
            .visit_service
            .visit_with_events(user.user_id, user.role.is_manager(), id)?;
    Ok(Json(VisitDetailResponse { visit, events }))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CheckBody {
    #[validate(range(min = -90.0, max = 90.0))]
    lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    lng: f64,
    #[validate(range(min = 0.0))]
    accuracy_m: f64,
    /// Check-out only: counts toward the note-proof requirement.
    note: Option<String>,
}

impl CheckBody {
    fn reading(&self) -> GpsReading {
        GpsReading {
            lat: self.lat,
            lng: self.lng,
            accuracy_m: self.accuracy_m,
        }
    }
}

async fn check_in(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<CheckBody>,
) -> Result<Json<Visit>> {
    let body = validated(body)?;
    let visit = state.visit_service.check_in(user.user_id, id, body.reading())?;
    Ok(Json(visit))
}

async fn check_out(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<CheckBody>,
) -> Result<Json<Visit>> {
    let body = validated(body)?;
    let visit =
        state
            .visit_service
            .check_out(user.user_id, id, body.reading(), body.note.as_deref())?;
    Ok(Json(visit))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PhotoBody {
    /// Opaque reference returned by the photo-storage collaborator.
    #[validate(length(min = 1))]
    photo_url: String,
}

async fn add_photo(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<PhotoBody>,
) -> Result<Json<VisitEvent>> {
    let body = validated(body)?;
    let event = state
        .visit_service
        .add_photo(user.user_id, id, &body.photo_url)?;
    Ok(Json(event))
}

#[derive(Deserialize, Validate)]
struct NoteBody {
    #[validate(length(min = 1))]
    note: String,
}

async fn add_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<NoteBody>,
) -> Result<Json<VisitEvent>> {
    let body = validated(body)?;
    let event = state.visit_service.add_note(user.user_id, id, &body.note)?;
    Ok(Json(event))
}

// ─── Expenses ────────────────────────────────────────────────

async fn my_expenses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ExpenseClaim>>> {
    Ok(Json(state.db.claims_for_user(user.user_id)))
}

async fn pending_expenses(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ExpenseClaim>>> {
    Ok(Json(state.db.pending_claims()))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ApproveBody {
    action: ApprovalAction,
    #[validate(range(min = 0.0))]
    km_approved: Option<f64>,
    #[validate(range(min = 0.0))]
    amount_approved: Option<f64>,
    note: Option<String>,
}

async fn approve_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<ApproveBody>,
) -> Result<Json<ExpenseClaim>> {
    let body = validated(body)?;
    let claim = state.approval_service.apply(
        user.user_id,
        id,
        Decision {
            action: body.action,
            km_approved: body.km_approved,
            amount_approved: body.amount_approved,
            note: body.note.clone(),
        },
    )?;
    Ok(Json(claim))
}

/// Explicit re-run of the reconciliation engine for a claim's session.
async fn reconcile_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseClaim>> {
    let claim = state
        .db
        .get_claim(id)
        .ok_or_else(|| AppError::NotFound(format!("Expense claim {} not found", id)))?;
    let claim = state.expense_service.reconcile_session(claim.session_id)?;
    Ok(Json(claim))
}
