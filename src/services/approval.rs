// SPDX-License-Identifier: MIT

//! Approval workflow for expense claims.
//!
//! Thin by design: a manager decision mutates only the claim's status and
//! approved fields, never its claimed fields, and every action appends an
//! immutable approval record plus an audit-log entry with before/after
//! claim snapshots.

use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{ApprovalAction, AuditLog, ClaimStatus, ExpenseApproval, ExpenseClaim};
use chrono::Utc;
use uuid::Uuid;

/// A manager decision to apply to a claim.
#[derive(Debug, Clone)]
pub struct Decision {
    pub action: ApprovalAction,
    pub km_approved: Option<f64>,
    pub amount_approved: Option<f64>,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct ApprovalService {
    db: Db,
}

impl ApprovalService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Apply a manager decision to a claim.
    pub fn apply(&self, approver_id: Uuid, claim_id: Uuid, decision: Decision) -> Result<ExpenseClaim> {
        let claim = self
            .db
            .get_claim(claim_id)
            .ok_or_else(|| AppError::NotFound(format!("Expense claim {} not found", claim_id)))?;

        let note = decision
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if decision.action == ApprovalAction::Adjust && note.is_none() {
            return Err(AppError::BadRequest(
                "A note is required when adjusting a claim".to_string(),
            ));
        }

        self.db.append_approval(ExpenseApproval {
            id: Uuid::new_v4(),
            claim_id,
            action: decision.action,
            approved_by_user_id: approver_id,
            note: note.map(str::to_string),
            created_at: Utc::now(),
        });

        let mut updated = claim.clone();
        match decision.action {
            ApprovalAction::Approve => {
                updated.status = ClaimStatus::Approved;
                updated.km_approved = claim.km_claimed;
                updated.amount_approved = claim.amount_claimed;
            }
            ApprovalAction::Reject => {
                updated.status = ClaimStatus::Rejected;
                updated.km_approved = 0.0;
                updated.amount_approved = 0.0;
            }
            ApprovalAction::Adjust => {
                // Free-form override: not required to match the claimed
                // values or the rate table.
                updated.status = ClaimStatus::Approved;
                updated.km_approved = decision.km_approved.unwrap_or(claim.km_claimed);
                updated.amount_approved = decision.amount_approved.unwrap_or(claim.amount_claimed);
            }
            ApprovalAction::RequestInfo => {
                // Recorded in the approval trail only; claim fields untouched.
            }
        }
        let updated = self.db.update_claim(updated);

        self.db.append_audit(AuditLog {
            id: 0,
            actor_user_id: Some(approver_id),
            entity_type: "expense_claim".to_string(),
            entity_id: claim_id.to_string(),
            action: audit_action(decision.action),
            before_json: serde_json::to_value(&claim).ok(),
            after_json: serde_json::to_value(&updated).ok(),
            created_at: Utc::now(),
        });

        tracing::info!(
            claim_id = %claim_id,
            approver_id = %approver_id,
            action = ?decision.action,
            "Applied approval decision"
        );
        Ok(updated)
    }
}

fn audit_action(action: ApprovalAction) -> String {
    match action {
        ApprovalAction::Approve => "EXPENSE_APPROVE",
        ApprovalAction::Reject => "EXPENSE_REJECT",
        ApprovalAction::Adjust => "EXPENSE_ADJUST",
        ApprovalAction::RequestInfo => "EXPENSE_REQUEST_INFO",
    }
    .to_string()
}
