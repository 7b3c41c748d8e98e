// SPDX-License-Identifier: MIT

//! User model for authentication and role checks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a user, controls access to manager-only operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Manager,
    Sales,
    Projects,
}

impl UserRole {
    /// Whether this role may act on other users' data (approvals, assignment).
    pub fn is_manager(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

/// Stored user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    /// PBKDF2 password hash, never serialized to API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
