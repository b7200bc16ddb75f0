//! Core business logic - framework-agnostic halaqah and pairing workflows.
//!
//! Every operation takes the database connection and an explicit
//! [`auth::AuthContext`] describing the caller. Check-then-act sequences run
//! inside a single database transaction.

/// Caller identity and role checks
pub mod auth;
/// Halaqah capacity and waitlist management
pub mod halaqah;
/// Pair and trio creation, extension, and dissolution
pub mod pairing;
/// Read-side aggregation of partner preferences
pub mod statistics;
/// Enrollment confirmations and declared partner preferences
pub mod submission;

use crate::errors::{Error, Result};

/// Fails with a validation error when a required text field is blank.
pub(crate) fn require_field(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::validation(format!("Missing required field: {field}")))
    } else {
        Ok(())
    }
}

/// Trims an optional text field, mapping blank input to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
