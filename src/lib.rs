// SPDX-License-Identifier: MIT

//! Fieldtrack: field-staff duty sessions, geofenced visits, and GPS-derived
//! travel-expense claims.
//!
//! This crate provides the backend API for tracking a field user's work
//! day, validating geofenced visit check-ins/check-outs, and reconciling
//! the day's GPS trail into an expense claim for manager approval.

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;

use config::Config;
use db::Db;
use services::{ApprovalService, DutyService, ExpenseService, VisitService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub duty_service: DutyService,
    pub visit_service: VisitService,
    pub expense_service: ExpenseService,
    pub approval_service: ApprovalService,
}

impl AppState {
    /// Wire up all services over one database handle.
    pub fn new(config: Config, db: Db) -> Self {
        let expense_service = ExpenseService::new(db.clone());
        Self {
            duty_service: DutyService::new(db.clone(), expense_service.clone()),
            visit_service: VisitService::new(db.clone()),
            approval_service: ApprovalService::new(db.clone()),
            expense_service,
            config,
            db,
        }
    }
}
