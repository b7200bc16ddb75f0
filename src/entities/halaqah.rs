//! Halaqah entity - a fixed-capacity study group within a batch.
//!
//! `max_students` and `waitlist_max` are nullable; the effective limits fall
//! back to the defaults in [`crate::core::halaqah`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Halaqah database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "halaqah")]
pub struct Model {
    /// Unique identifier for the halaqah
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Batch (cohort) this halaqah belongs to
    pub batch_id: String,
    /// Display name
    pub name: String,
    /// Active seat limit, `None` means the default capacity
    pub max_students: Option<i32>,
    /// Waitlist length limit, `None` means the default cap
    pub waitlist_max: Option<i32>,
    /// When the halaqah was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Halaqah and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One halaqah has many enrollments
    #[sea_orm(has_many = "super::halaqah_student::Entity")]
    Students,
}

impl Related<super::halaqah_student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
