//! Unified error type for the halaqah and pairing workflows.
//!
//! Variants are grouped by failure category (authentication, authorization,
//! validation, state conflict, not found, persistence). The HTTP layer maps
//! each category onto a status code in [`crate::api::error`].

use thiserror::Error;

/// All errors produced by the core workflows, configuration, and storage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Underlying database call failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (binding the listener, reading files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No valid session was presented
    #[error("Unauthorized")]
    Unauthorized,

    /// Valid session, but the caller lacks the required role or ownership
    #[error("Forbidden: {message}")]
    Forbidden {
        /// What the caller was not allowed to do
        message: String,
    },

    /// Missing or malformed input, detected before any mutation
    #[error("{message}")]
    Validation {
        /// Human-readable validation failure
        message: String,
    },

    /// Halaqah does not exist
    #[error("Halaqah not found: {id}")]
    HalaqahNotFound {
        /// Requested halaqah id
        id: i64,
    },

    /// No live (active or waitlisted) enrollment for the student
    #[error("Enrollment not found for student {student_id} in halaqah {halaqah_id}")]
    EnrollmentNotFound {
        /// Halaqah the lookup was scoped to
        halaqah_id: i64,
        /// Student that was looked up
        student_id: String,
    },

    /// Pairing does not exist or is no longer confirmed
    #[error("Pairing not found: {id}")]
    PairingNotFound {
        /// Requested pairing id (or a user/batch description)
        id: String,
    },

    /// Enrollment confirmation does not exist
    #[error("Submission not found: {id}")]
    SubmissionNotFound {
        /// Requested submission id
        id: i64,
    },

    /// Student already holds an active seat
    #[error("Already enrolled in this halaqah")]
    AlreadyEnrolled,

    /// Promotion requested for an enrollment that is not waitlisted
    #[error("Student is not on waitlist (current status: {status})")]
    NotOnWaitlist {
        /// Current enrollment status
        status: String,
    },

    /// Active roster is at capacity
    #[error("Cannot promote - halaqah is at full capacity ({active}/{max})")]
    HalaqahFull {
        /// Current active count
        active: u64,
        /// Effective capacity
        max: u64,
    },

    /// Both the roster and the waitlist are full
    #[error("Halaqah is full and waitlist is at maximum capacity")]
    WaitlistFull {
        /// Current waitlist length
        waitlisted: u64,
        /// Effective waitlist cap
        max: u64,
    },

    /// One of the users already belongs to a confirmed pairing
    #[error("Pairing already exists for these users")]
    PairingExists,

    /// Trio slot already taken
    #[error("This pair already has 3 members")]
    PairFull,

    /// User is already a member of the target pairing
    #[error("User is already in this pair")]
    AlreadyInPair,

    /// User belongs to a different confirmed pairing in the batch
    #[error("User is already paired in another group")]
    PairedElsewhere,

    /// Partner details edit on a registered-partner pairing
    #[error("Only family and tarteel pairings can be edited")]
    NotEditable,

    /// Confirmation already approved and locked
    #[error("Submission has already been approved")]
    AlreadyApproved,
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Forbidden`] with the given message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
