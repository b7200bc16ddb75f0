//! Pairing entity - a study pair or trio within a batch.
//!
//! `user_2_id` is null for family/tarteel pairings whose partner has no
//! account; the partner is then described in `notes`. Registered pairs are
//! stored with the smaller user id in `user_1_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a pairing (or a declared partner preference) came about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PairingType {
    /// Admin matched two registered students
    #[sea_orm(string_value = "system_match")]
    SystemMatch,
    /// Student named a registered peer
    #[sea_orm(string_value = "self_match")]
    SelfMatch,
    /// External listening partner
    #[sea_orm(string_value = "tarteel")]
    Tarteel,
    /// Family member
    #[sea_orm(string_value = "family")]
    Family,
}

impl PairingType {
    /// Whether the partner is described by text rather than an account.
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(self, Self::Tarteel | Self::Family)
    }

    /// Stable lowercase name, matching the stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SystemMatch => "system_match",
            Self::SelfMatch => "self_match",
            Self::Tarteel => "tarteel",
            Self::Family => "family",
        }
    }
}

/// Lifecycle state of a pairing row
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PairingStatus {
    /// Confirmed
    #[sea_orm(string_value = "active")]
    Active,
    /// Confirmed (legacy spelling, same meaning as `Active`)
    #[sea_orm(string_value = "paired")]
    Paired,
    /// Broken up by an admin; members are free to be re-matched
    #[sea_orm(string_value = "dissolved")]
    Dissolved,
}

impl PairingStatus {
    /// Statuses that count towards the one-pairing-per-user rule.
    pub const CONFIRMED: [Self; 2] = [Self::Active, Self::Paired];

    /// `Active` and `Paired` are equivalent.
    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        matches!(self, Self::Active | Self::Paired)
    }
}

/// Pairing database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "study_partners")]
pub struct Model {
    /// Unique identifier for the pairing
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Batch (cohort) the pairing is scoped to
    pub batch_id: String,
    /// First member
    pub user_1_id: String,
    /// Second member, `None` when the partner is unregistered
    pub user_2_id: Option<String>,
    /// Third member of a trio
    pub user_3_id: Option<String>,
    /// How the pairing was formed
    pub pairing_type: PairingType,
    /// Lifecycle state
    pub pairing_status: PairingStatus,
    /// Admin who created the pairing
    pub paired_by: Option<String>,
    /// When the pairing was created
    pub paired_at: Option<DateTimeUtc>,
    /// Free-text description of an unregistered partner
    pub notes: Option<String>,
}

impl Model {
    /// Registered members of this pairing, in slot order.
    #[must_use]
    pub fn members(&self) -> Vec<&str> {
        std::iter::once(self.user_1_id.as_str())
            .chain(self.user_2_id.as_deref())
            .chain(self.user_3_id.as_deref())
            .collect()
    }

    /// Whether `user_id` occupies any slot.
    #[must_use]
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members().contains(&user_id)
    }
}

/// `Pairing` rows link to submissions by `(user_id, batch_id)` only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
