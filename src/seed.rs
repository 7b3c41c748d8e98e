// SPDX-License-Identifier: MIT

//! Demo data seeding for local development.

use crate::db::Db;
use crate::models::{ExpensePolicy, User, UserRole};
use crate::services::password::hash_password;
use chrono::Utc;
use uuid::Uuid;

/// Seed demo users and a default expense policy, skipping anything that
/// already exists. Intended for local development only.
pub fn seed_demo_data(db: &Db) -> anyhow::Result<()> {
    let users = [
        ("Asha Verma", "admin@fieldtrack.dev", "admin123", UserRole::Admin),
        ("Rahul Nair", "manager@fieldtrack.dev", "manager123", UserRole::Manager),
        ("Priya Singh", "sales@fieldtrack.dev", "sales123", UserRole::Sales),
    ];

    for (full_name, email, password, role) in users {
        if db.get_user_by_email(email).is_some() {
            continue;
        }
        db.insert_user(User {
            id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            role,
            is_active: true,
            created_at: Utc::now(),
        });
        tracing::info!(email, ?role, "Seeded demo user");
    }

    if db.active_policy().is_none() {
        db.insert_policy(ExpensePolicy {
            id: Uuid::new_v4(),
            name: "Standard travel policy".to_string(),
            rate_per_km: 10.0,
            min_accuracy_m: 80.0,
            max_ping_gap_minutes: 10.0,
            min_valid_segments: 10,
            ping_interval_sec: 60,
            geofence_default_m: 150.0,
            effective_from: Utc::now().date_naive(),
            is_active: true,
        });
        tracing::info!("Seeded default expense policy");
    }

    Ok(())
}
