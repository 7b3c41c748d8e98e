// SPDX-License-Identifier: MIT

//! Core domain services.

pub mod approval;
pub mod duty;
pub mod expense;
pub mod password;
pub mod visit;

pub use approval::{ApprovalService, Decision};
pub use duty::{DutyService, TrailSample};
pub use expense::ExpenseService;
pub use visit::{GpsReading, VisitService};
