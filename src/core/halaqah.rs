//! Halaqah capacity business logic - enrollment, withdrawal, and waitlist promotion.
//!
//! Each halaqah keeps an `active` roster bounded by its capacity and a FIFO
//! waitlist ordered by `joined_waitlist_at` (ties broken by row id). Every
//! read-count-then-write sequence runs in one transaction so the capacity
//! invariant holds under concurrent requests.

use super::{auth::AuthContext, require_field};
use crate::{
    entities::{EnrollmentStatus, Halaqah, HalaqahStudent, halaqah, halaqah_student},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Seat limit used when a halaqah has no `max_students` configured.
pub const DEFAULT_MAX_STUDENTS: u64 = 20;

/// Waitlist cap used when a halaqah has no `waitlist_max` configured.
pub const DEFAULT_WAITLIST_MAX: u64 = 5;

/// Effective seat limit of `halaqah`.
#[must_use]
pub fn effective_capacity(halaqah: &halaqah::Model) -> u64 {
    halaqah
        .max_students
        .and_then(|n| u64::try_from(n).ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_MAX_STUDENTS)
}

/// Effective waitlist cap of `halaqah`.
#[must_use]
pub fn effective_waitlist_max(halaqah: &halaqah::Model) -> u64 {
    halaqah
        .waitlist_max
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(DEFAULT_WAITLIST_MAX)
}

/// Input for [`create_halaqah`].
#[derive(Debug, Clone)]
pub struct NewHalaqah {
    /// Batch the halaqah belongs to
    pub batch_id: String,
    /// Display name
    pub name: String,
    /// Seat limit, `None` for the default
    pub max_students: Option<i32>,
    /// Waitlist cap, `None` for the default
    pub waitlist_max: Option<i32>,
}

/// Outcome of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    /// Got a seat
    Joined,
    /// Queued on the waitlist
    Waitlisted,
}

/// Result of [`join`].
#[derive(Debug, Clone, Serialize)]
pub struct JoinResult {
    /// Whether the student got a seat or a waitlist slot
    pub status: JoinStatus,
    /// 1-based waitlist position, `None` when joined
    pub position: Option<u64>,
    /// The live enrollment row
    pub enrollment: halaqah_student::Model,
}

/// Result of [`leave`].
#[derive(Debug, Clone, Serialize)]
pub struct LeaveResult {
    /// The enrollment after being marked `dropped`
    pub dropped: halaqah_student::Model,
    /// The waitlisted enrollment that took the freed seat, if any
    pub promoted: Option<halaqah_student::Model>,
}

/// Roster and capacity figures of a halaqah.
#[derive(Debug, Clone, Serialize)]
pub struct Roster {
    /// The halaqah itself
    pub halaqah: halaqah::Model,
    /// Active enrollments, oldest first
    pub active: Vec<halaqah_student::Model>,
    /// Waitlisted enrollments in promotion order
    pub waitlist: Vec<halaqah_student::Model>,
    /// Effective seat limit
    pub capacity: u64,
    /// Effective waitlist cap
    pub waitlist_max: u64,
    /// Seats still open
    pub available_seats: u64,
}

/// Creates a halaqah after validating its limits.
#[instrument(skip(db, actor), fields(caller = %actor.user_id))]
pub async fn create_halaqah(
    db: &DatabaseConnection,
    actor: &AuthContext,
    new: NewHalaqah,
) -> Result<halaqah::Model> {
    require_field(&new.batch_id, "batch_id")?;
    require_field(&new.name, "name")?;
    actor.require_admin()?;

    if new.max_students.is_some_and(|n| n <= 0) {
        return Err(Error::validation("max_students must be greater than 0"));
    }
    if new.waitlist_max.is_some_and(|n| n < 0) {
        return Err(Error::validation("waitlist_max cannot be negative"));
    }

    let model = halaqah::ActiveModel {
        batch_id: Set(new.batch_id),
        name: Set(new.name.trim().to_string()),
        max_students: Set(new.max_students),
        waitlist_max: Set(new.waitlist_max),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await?;
    info!(halaqah_id = created.id, "halaqah created");
    Ok(created)
}

/// Finds a halaqah by id.
pub async fn get_halaqah<C>(db: &C, halaqah_id: i64) -> Result<Option<halaqah::Model>>
where
    C: ConnectionTrait,
{
    Halaqah::find_by_id(halaqah_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the student's active or waitlisted enrollment.
pub async fn find_live_enrollment<C>(
    db: &C,
    halaqah_id: i64,
    student_id: &str,
) -> Result<Option<halaqah_student::Model>>
where
    C: ConnectionTrait,
{
    HalaqahStudent::find()
        .filter(halaqah_student::Column::HalaqahId.eq(halaqah_id))
        .filter(halaqah_student::Column::StudentId.eq(student_id))
        .filter(halaqah_student::Column::Status.ne(EnrollmentStatus::Dropped))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the student's most recent enrollment in any status.
async fn find_latest_enrollment<C>(
    db: &C,
    halaqah_id: i64,
    student_id: &str,
) -> Result<Option<halaqah_student::Model>>
where
    C: ConnectionTrait,
{
    HalaqahStudent::find()
        .filter(halaqah_student::Column::HalaqahId.eq(halaqah_id))
        .filter(halaqah_student::Column::StudentId.eq(student_id))
        .order_by_desc(halaqah_student::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Counts enrollments of `halaqah_id` in `status`.
pub async fn count_with_status<C>(db: &C, halaqah_id: i64, status: EnrollmentStatus) -> Result<u64>
where
    C: ConnectionTrait,
{
    HalaqahStudent::find()
        .filter(halaqah_student::Column::HalaqahId.eq(halaqah_id))
        .filter(halaqah_student::Column::Status.eq(status))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Waitlisted enrollments in promotion order.
pub async fn waitlist_queue<C>(db: &C, halaqah_id: i64) -> Result<Vec<halaqah_student::Model>>
where
    C: ConnectionTrait,
{
    HalaqahStudent::find()
        .filter(halaqah_student::Column::HalaqahId.eq(halaqah_id))
        .filter(halaqah_student::Column::Status.eq(EnrollmentStatus::Waitlist))
        .order_by_asc(halaqah_student::Column::JoinedWaitlistAt)
        .order_by_asc(halaqah_student::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn mark_promoted<C>(db: &C, enrollment: halaqah_student::Model) -> Result<halaqah_student::Model>
where
    C: ConnectionTrait,
{
    let mut model: halaqah_student::ActiveModel = enrollment.into();
    model.status = Set(EnrollmentStatus::Active);
    model.promoted_from_waitlist_at = Set(Some(Utc::now()));
    model.update(db).await.map_err(Into::into)
}

/// Enrolls a student, falling back to the waitlist when the roster is full.
///
/// A student already on the waitlist gets their current position back
/// without any change.
#[instrument(skip(db, actor), fields(caller = %actor.user_id))]
pub async fn join(
    db: &DatabaseConnection,
    actor: &AuthContext,
    halaqah_id: i64,
    student_id: &str,
) -> Result<JoinResult> {
    require_field(student_id, "student_id")?;
    actor.require_self_or_admin(student_id)?;

    let txn = db.begin().await?;

    let halaqah = get_halaqah(&txn, halaqah_id)
        .await?
        .ok_or(Error::HalaqahNotFound { id: halaqah_id })?;

    if let Some(existing) = find_live_enrollment(&txn, halaqah_id, student_id).await? {
        if existing.status == EnrollmentStatus::Active {
            return Err(Error::AlreadyEnrolled);
        }
        let queue = waitlist_queue(&txn, halaqah_id).await?;
        let position = queue.iter().position(|e| e.id == existing.id).map(|i| i as u64 + 1);
        debug!(halaqah_id, student_id, ?position, "student already waitlisted");
        return Ok(JoinResult {
            status: JoinStatus::Waitlisted,
            position,
            enrollment: existing,
        });
    }

    let now = Utc::now();
    let active = count_with_status(&txn, halaqah_id, EnrollmentStatus::Active).await?;
    let capacity = effective_capacity(&halaqah);

    let (status, position, joined_waitlist_at) = if active < capacity {
        (EnrollmentStatus::Active, None, None)
    } else {
        let waitlisted = count_with_status(&txn, halaqah_id, EnrollmentStatus::Waitlist).await?;
        let max = effective_waitlist_max(&halaqah);
        if waitlisted >= max {
            warn!(halaqah_id, student_id, waitlisted, max, "waitlist full");
            return Err(Error::WaitlistFull { waitlisted, max });
        }
        (EnrollmentStatus::Waitlist, Some(waitlisted + 1), Some(now))
    };

    let enrollment = halaqah_student::ActiveModel {
        halaqah_id: Set(halaqah_id),
        student_id: Set(student_id.to_string()),
        status: Set(status),
        assigned_at: Set(now),
        joined_waitlist_at: Set(joined_waitlist_at),
        promoted_from_waitlist_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(halaqah_id, student_id, status = status.as_str(), "student enrolled");
    Ok(JoinResult {
        status: if status == EnrollmentStatus::Active {
            JoinStatus::Joined
        } else {
            JoinStatus::Waitlisted
        },
        position,
        enrollment,
    })
}

/// Withdraws a student, then promotes the earliest waitlisted student while
/// the roster has a free seat.
#[instrument(skip(db, actor), fields(caller = %actor.user_id))]
pub async fn leave(
    db: &DatabaseConnection,
    actor: &AuthContext,
    halaqah_id: i64,
    student_id: &str,
) -> Result<LeaveResult> {
    require_field(student_id, "student_id")?;
    actor.require_self_or_admin(student_id)?;

    let txn = db.begin().await?;

    let enrollment = find_live_enrollment(&txn, halaqah_id, student_id)
        .await?
        .ok_or_else(|| Error::EnrollmentNotFound {
            halaqah_id,
            student_id: student_id.to_string(),
        })?;

    let mut model: halaqah_student::ActiveModel = enrollment.into();
    model.status = Set(EnrollmentStatus::Dropped);
    let dropped = model.update(&txn).await?;

    let capacity = match get_halaqah(&txn, halaqah_id).await? {
        Some(halaqah) => effective_capacity(&halaqah),
        None => DEFAULT_MAX_STUDENTS,
    };
    let active = count_with_status(&txn, halaqah_id, EnrollmentStatus::Active).await?;

    let promoted = if active < capacity {
        match waitlist_queue(&txn, halaqah_id).await?.into_iter().next() {
            Some(next) => Some(mark_promoted(&txn, next).await?),
            None => None,
        }
    } else {
        None
    };

    txn.commit().await?;

    info!(
        halaqah_id,
        student_id,
        promoted = promoted.as_ref().map(|p| p.student_id.as_str()),
        "student left halaqah"
    );
    Ok(LeaveResult { dropped, promoted })
}

/// Moves a waitlisted student into the active roster on an admin's request,
/// provided a seat is free.
#[instrument(skip(db, actor), fields(caller = %actor.user_id))]
pub async fn promote_from_waitlist(
    db: &DatabaseConnection,
    actor: &AuthContext,
    halaqah_id: i64,
    student_id: &str,
) -> Result<halaqah_student::Model> {
    require_field(student_id, "student_id")?;
    actor.require_admin()?;

    let txn = db.begin().await?;

    let enrollment = find_latest_enrollment(&txn, halaqah_id, student_id)
        .await?
        .ok_or_else(|| Error::EnrollmentNotFound {
            halaqah_id,
            student_id: student_id.to_string(),
        })?;

    if enrollment.status != EnrollmentStatus::Waitlist {
        return Err(Error::NotOnWaitlist {
            status: enrollment.status.as_str().to_string(),
        });
    }

    let halaqah = get_halaqah(&txn, halaqah_id)
        .await?
        .ok_or(Error::HalaqahNotFound { id: halaqah_id })?;

    let active = count_with_status(&txn, halaqah_id, EnrollmentStatus::Active).await?;
    let max = effective_capacity(&halaqah);
    if active >= max {
        warn!(halaqah_id, student_id, active, max, "promotion blocked at capacity");
        return Err(Error::HalaqahFull { active, max });
    }

    let promoted = mark_promoted(&txn, enrollment).await?;
    txn.commit().await?;

    info!(halaqah_id, student_id, "student promoted from waitlist");
    Ok(promoted)
}

/// Returns the roster, the ordered waitlist, and capacity figures.
pub async fn list_students(db: &DatabaseConnection, halaqah_id: i64) -> Result<Roster> {
    let halaqah = get_halaqah(db, halaqah_id)
        .await?
        .ok_or(Error::HalaqahNotFound { id: halaqah_id })?;

    let active = HalaqahStudent::find()
        .filter(halaqah_student::Column::HalaqahId.eq(halaqah_id))
        .filter(halaqah_student::Column::Status.eq(EnrollmentStatus::Active))
        .order_by_asc(halaqah_student::Column::Id)
        .all(db)
        .await?;
    let waitlist = waitlist_queue(db, halaqah_id).await?;

    let capacity = effective_capacity(&halaqah);
    let waitlist_max = effective_waitlist_max(&halaqah);
    let available_seats = capacity.saturating_sub(active.len() as u64);

    Ok(Roster {
        halaqah,
        active,
        waitlist,
        capacity,
        waitlist_max,
        available_seats,
    })
}
