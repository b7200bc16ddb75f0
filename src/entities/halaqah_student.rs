//! Enrollment entity - one row per student per halaqah.
//!
//! Rows are never deleted. Withdrawal moves a row to `dropped`, and a student
//! holds at most one non-dropped row per halaqah.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enrollment state of a student within a halaqah
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Holds a seat
    #[sea_orm(string_value = "active")]
    Active,
    /// Queued for a seat
    #[sea_orm(string_value = "waitlist")]
    Waitlist,
    /// Left the halaqah
    #[sea_orm(string_value = "dropped")]
    Dropped,
}

impl EnrollmentStatus {
    /// Stable lowercase name, matching the stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waitlist => "waitlist",
            Self::Dropped => "dropped",
        }
    }
}

/// Enrollment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "halaqah_students")]
pub struct Model {
    /// Unique identifier for the enrollment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning halaqah
    pub halaqah_id: i64,
    /// Enrolled student (identity-provider user id)
    pub student_id: String,
    /// Current enrollment state
    pub status: EnrollmentStatus,
    /// When the enrollment row was created
    pub assigned_at: DateTimeUtc,
    /// Set when the row enters the waitlist; FIFO ordering key
    pub joined_waitlist_at: Option<DateTimeUtc>,
    /// Set when a waitlisted row becomes active
    pub promoted_from_waitlist_at: Option<DateTimeUtc>,
}

/// Defines relationships between Enrollment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each enrollment belongs to one halaqah
    #[sea_orm(
        belongs_to = "super::halaqah::Entity",
        from = "Column::HalaqahId",
        to = "super::halaqah::Column::Id"
    )]
    Halaqah,
}

impl Related<super::halaqah::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Halaqah.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
