//! Enrollment confirmation entity - the student's re-enrollment record for a
//! batch, including the declared partner preference.

use super::study_partner::PairingType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Review state of a confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Being edited
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Waiting for admin review
    #[sea_orm(string_value = "submitted")]
    Submitted,
    /// Accepted
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Declined
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Pairing progress as seen from the confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPairingStatus {
    /// Awaiting a match or admin review
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Part of a confirmed pairing
    #[sea_orm(string_value = "paired")]
    Paired,
}

/// Enrollment confirmation database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daftar_ulang_submissions")]
pub struct Model {
    /// Unique identifier for the confirmation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning student
    pub user_id: String,
    /// Batch being re-enrolled into
    pub batch_id: String,
    /// Declared partner preference
    pub partner_type: PairingType,
    /// Registered partner for `self_match`
    pub partner_user_id: Option<String>,
    /// Partner name for family/tarteel
    pub partner_name: Option<String>,
    /// Relationship to a family partner
    pub partner_relationship: Option<String>,
    /// Free-form notes about the partner
    pub partner_notes: Option<String>,
    /// `None` until a preference is under review
    pub pairing_status: Option<SubmissionPairingStatus>,
    /// Review state
    pub status: SubmissionStatus,
    /// Reason recorded by the last rejection
    pub rejection_reason: Option<String>,
    /// Admin who approved the confirmation
    pub reviewed_by: Option<String>,
    /// When it was approved
    pub reviewed_at: Option<DateTimeUtc>,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

/// Confirmations link to pairings by `(user_id, batch_id)` only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
