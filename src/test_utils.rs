//! Shared test utilities for `HalaqahBuddy`.
//!
//! Helpers for setting up in-memory databases, caller contexts, and test rows
//! with sensible defaults.

use crate::{
    core::auth::{AuthContext, Role},
    entities::{EnrollmentStatus, PairingType, SubmissionStatus, halaqah, halaqah_student, submission},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// User id carried by [`admin`].
pub const ADMIN_ID: &str = "admin-1";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("halaqah_buddy=debug")
        .with_test_writer()
        .try_init();
}

/// Caller context for an administrator.
pub fn admin() -> AuthContext {
    AuthContext::new(ADMIN_ID, vec![Role::Admin])
}

/// Caller context for a student with the given id.
pub fn student(user_id: &str) -> AuthContext {
    AuthContext::new(user_id, vec![Role::Thalibah])
}

/// Inserts a halaqah in batch `"batch-1"` with the given limits.
pub async fn create_test_halaqah(
    db: &DatabaseConnection,
    max_students: Option<i32>,
    waitlist_max: Option<i32>,
) -> Result<halaqah::Model> {
    halaqah::ActiveModel {
        batch_id: Set("batch-1".to_string()),
        name: Set("Halaqah Test".to_string()),
        max_students: Set(max_students),
        waitlist_max: Set(waitlist_max),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts an enrollment row directly, bypassing capacity checks.
pub async fn insert_enrollment(
    db: &DatabaseConnection,
    halaqah_id: i64,
    student_id: &str,
    status: EnrollmentStatus,
    joined_waitlist_at: Option<DateTime<Utc>>,
) -> Result<halaqah_student::Model> {
    halaqah_student::ActiveModel {
        halaqah_id: Set(halaqah_id),
        student_id: Set(student_id.to_string()),
        status: Set(status),
        assigned_at: Set(Utc::now()),
        joined_waitlist_at: Set(joined_waitlist_at),
        promoted_from_waitlist_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts a submitted confirmation with the given partner type.
///
/// # Defaults
/// * `status`: submitted
/// * `pairing_status`: None
/// * `partner_name`: "Test Partner" for family and tarteel
pub async fn create_test_submission(
    db: &DatabaseConnection,
    user_id: &str,
    batch_id: &str,
    partner_type: PairingType,
) -> Result<submission::Model> {
    let now = Utc::now();
    let partner_name = partner_type
        .is_external()
        .then(|| "Test Partner".to_string());

    submission::ActiveModel {
        user_id: Set(user_id.to_string()),
        batch_id: Set(batch_id.to_string()),
        partner_type: Set(partner_type),
        partner_user_id: Set(None),
        partner_name: Set(partner_name),
        partner_relationship: Set(None),
        partner_notes: Set(None),
        pairing_status: Set(None),
        status: Set(SubmissionStatus::Submitted),
        rejection_reason: Set(None),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
