// SPDX-License-Identifier: MIT

//! Data model types shared between the store, services, and API.

pub mod audit;
pub mod duty;
pub mod expense;
pub mod user;
pub mod visit;

pub use audit::AuditLog;
pub use duty::{DutySession, LocationPoint, LocationSource, SessionStatus};
pub use expense::{ApprovalAction, ClaimStatus, ExpenseApproval, ExpenseClaim, ExpensePolicy};
pub use user::{User, UserRole};
pub use visit::{Visit, VisitEvent, VisitEventType, VisitStatus, VisitType};
