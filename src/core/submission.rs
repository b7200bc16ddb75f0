//! Enrollment confirmations (daftar ulang) and their partner preferences.

use super::{auth::AuthContext, non_blank, pairing, require_field};
use crate::{
    entities::{
        PairingType, Submission, SubmissionPairingStatus, SubmissionStatus, submission,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument, warn};

/// Partner choice declared by a student.
#[derive(Debug, Clone)]
pub struct PartnerPreference {
    /// How the student wants to be paired
    pub partner_type: PairingType,
    /// Registered partner for `self_match`
    pub partner_user_id: Option<String>,
    /// Partner's name for `family` and `tarteel`
    pub partner_name: Option<String>,
    /// Relationship to the partner
    pub partner_relationship: Option<String>,
    /// Free-form notes
    pub partner_notes: Option<String>,
}

/// Partial update of a family or tarteel partner's description.
/// `None` leaves a field untouched; a blank string clears it.
#[derive(Debug, Clone, Default)]
pub struct PartnerDetailsUpdate {
    /// Partner's name (may not be cleared)
    pub partner_name: Option<String>,
    /// Relationship to the partner
    pub partner_relationship: Option<String>,
    /// Free-form notes
    pub partner_notes: Option<String>,
}

/// Finds a confirmation by id.
pub async fn get_submission<C>(db: &C, submission_id: i64) -> Result<submission::Model>
where
    C: ConnectionTrait,
{
    Submission::find_by_id(submission_id)
        .one(db)
        .await?
        .ok_or(Error::SubmissionNotFound { id: submission_id })
}

/// Finds the user's confirmation for a batch.
pub async fn find_submission_for_user<C>(
    db: &C,
    user_id: &str,
    batch_id: &str,
) -> Result<Option<submission::Model>>
where
    C: ConnectionTrait,
{
    debug!(user_id, batch_id, "looking up submission");
    Submission::find()
        .filter(submission::Column::UserId.eq(user_id))
        .filter(submission::Column::BatchId.eq(batch_id))
        .one(db)
        .await
        .map_err(Into::into)
}

fn check_preference(actor: &AuthContext, pref: &PartnerPreference) -> Result<()> {
    match pref.partner_type {
        PairingType::SelfMatch => {
            let partner = pref.partner_user_id.as_deref().unwrap_or_default();
            require_field(partner, "partner_user_id")?;
            if partner == actor.user_id {
                return Err(Error::validation("Cannot pair user with themselves"));
            }
        }
        PairingType::Family | PairingType::Tarteel => {
            require_field(
                pref.partner_name.as_deref().unwrap_or_default(),
                "partner_name",
            )?;
        }
        PairingType::SystemMatch => {}
    }
    Ok(())
}

/// Creates or updates the caller's confirmation for `batch_id` with a new
/// partner preference. The confirmation goes back to `submitted` and waits
/// for review.
#[instrument(skip(db, actor, pref), fields(caller = %actor.user_id, partner_type = pref.partner_type.as_str()))]
pub async fn declare_partner_preference(
    db: &DatabaseConnection,
    actor: &AuthContext,
    batch_id: &str,
    pref: PartnerPreference,
) -> Result<submission::Model> {
    require_field(batch_id, "batch_id")?;
    check_preference(actor, &pref)?;

    let (partner_user_id, partner_name, partner_relationship, partner_notes) =
        match pref.partner_type {
            PairingType::SystemMatch => (None, None, None, non_blank(pref.partner_notes)),
            PairingType::SelfMatch => (
                non_blank(pref.partner_user_id),
                None,
                None,
                non_blank(pref.partner_notes),
            ),
            PairingType::Family | PairingType::Tarteel => (
                None,
                non_blank(pref.partner_name),
                non_blank(pref.partner_relationship),
                non_blank(pref.partner_notes),
            ),
        };

    let txn = db.begin().await?;
    let now = Utc::now();

    let saved = match find_submission_for_user(&txn, &actor.user_id, batch_id).await? {
        Some(existing) if existing.status == SubmissionStatus::Approved => {
            warn!(submission_id = existing.id, "preference change after approval");
            return Err(Error::AlreadyApproved);
        }
        Some(existing) => {
            let mut model: submission::ActiveModel = existing.into();
            model.partner_type = Set(pref.partner_type);
            model.partner_user_id = Set(partner_user_id);
            model.partner_name = Set(partner_name);
            model.partner_relationship = Set(partner_relationship);
            model.partner_notes = Set(partner_notes);
            model.pairing_status = Set(Some(SubmissionPairingStatus::Pending));
            model.status = Set(SubmissionStatus::Submitted);
            model.rejection_reason = Set(None);
            model.updated_at = Set(now);
            model.update(&txn).await?
        }
        None => {
            submission::ActiveModel {
                user_id: Set(actor.user_id.clone()),
                batch_id: Set(batch_id.to_string()),
                partner_type: Set(pref.partner_type),
                partner_user_id: Set(partner_user_id),
                partner_name: Set(partner_name),
                partner_relationship: Set(partner_relationship),
                partner_notes: Set(partner_notes),
                pairing_status: Set(Some(SubmissionPairingStatus::Pending)),
                status: Set(SubmissionStatus::Submitted),
                rejection_reason: Set(None),
                reviewed_by: Set(None),
                reviewed_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    info!(submission_id = saved.id, batch_id, "partner preference declared");
    Ok(saved)
}

/// Rejects a partner request, sending the student back to the
/// `system_match` pool. Approved confirmations are locked.
#[instrument(skip(db, actor, reason), fields(caller = %actor.user_id))]
pub async fn reject_pairing_request(
    db: &DatabaseConnection,
    actor: &AuthContext,
    submission_id: i64,
    reason: Option<String>,
) -> Result<submission::Model> {
    actor.require_admin()?;

    let txn = db.begin().await?;
    let found = get_submission(&txn, submission_id).await?;
    if found.status == SubmissionStatus::Approved {
        warn!(submission_id, "reject after approval");
        return Err(Error::AlreadyApproved);
    }

    let mut model: submission::ActiveModel = found.into();
    model.partner_type = Set(PairingType::SystemMatch);
    model.partner_user_id = Set(None);
    model.partner_name = Set(None);
    model.partner_relationship = Set(None);
    model.partner_notes = Set(None);
    model.pairing_status = Set(None);
    model.rejection_reason = Set(non_blank(reason));
    model.reviewed_by = Set(Some(actor.user_id.clone()));
    model.reviewed_at = Set(Some(Utc::now()));
    model.updated_at = Set(Utc::now());
    let rejected = model.update(&txn).await?;

    txn.commit().await?;

    info!(submission_id, "pairing request rejected");
    Ok(rejected)
}

/// Edits the description of the caller's family or tarteel partner.
#[instrument(skip(db, actor, update), fields(caller = %actor.user_id))]
pub async fn update_partner_details(
    db: &DatabaseConnection,
    actor: &AuthContext,
    submission_id: i64,
    update: PartnerDetailsUpdate,
) -> Result<submission::Model> {
    if let Some(name) = &update.partner_name {
        require_field(name, "partner_name")?;
    }

    let txn = db.begin().await?;
    let found = get_submission(&txn, submission_id).await?;

    if found.user_id != actor.user_id {
        warn!(submission_id, owner = %found.user_id, "edit of another user's submission");
        return Err(Error::forbidden("Submission belongs to another user"));
    }
    if !found.partner_type.is_external() {
        return Err(Error::NotEditable);
    }

    let mut model: submission::ActiveModel = found.into();
    if let Some(name) = update.partner_name {
        model.partner_name = Set(non_blank(Some(name)));
    }
    if let Some(relationship) = update.partner_relationship {
        model.partner_relationship = Set(non_blank(Some(relationship)));
    }
    if let Some(notes) = update.partner_notes {
        model.partner_notes = Set(non_blank(Some(notes)));
    }
    model.updated_at = Set(Utc::now());
    let updated = model.update(&txn).await?;

    txn.commit().await?;

    info!(submission_id, "partner details updated");
    Ok(updated)
}

/// Moves a confirmation to another partner type, dissolving any confirmed
/// pairing its owner has in the batch.
#[instrument(skip(db, actor, details), fields(caller = %actor.user_id, new_type = new_type.as_str()))]
pub async fn change_partner_type(
    db: &DatabaseConnection,
    actor: &AuthContext,
    submission_id: i64,
    new_type: PairingType,
    details: PartnerDetailsUpdate,
) -> Result<submission::Model> {
    actor.require_admin()?;
    if new_type == PairingType::SelfMatch {
        return Err(Error::validation(
            "new_partner_type must be system_match, family, or tarteel",
        ));
    }
    if new_type.is_external() {
        require_field(
            details.partner_name.as_deref().unwrap_or_default(),
            "partner_name",
        )?;
    }

    let txn = db.begin().await?;
    let found = get_submission(&txn, submission_id).await?;

    if let Some(existing) =
        pairing::find_confirmed_pairing_for_user(&txn, &found.user_id, &found.batch_id).await?
    {
        pairing::dissolve_in(&txn, existing).await?;
    }

    let (name, relationship, notes) = match new_type {
        PairingType::Family => (
            non_blank(details.partner_name),
            non_blank(details.partner_relationship),
            non_blank(details.partner_notes),
        ),
        PairingType::Tarteel => (
            non_blank(details.partner_name),
            None,
            non_blank(details.partner_notes),
        ),
        _ => (None, None, None),
    };

    let mut model: submission::ActiveModel = found.into();
    model.partner_type = Set(new_type);
    model.partner_user_id = Set(None);
    model.partner_name = Set(name);
    model.partner_relationship = Set(relationship);
    model.partner_notes = Set(notes);
    model.pairing_status = Set(Some(SubmissionPairingStatus::Pending));
    model.status = Set(SubmissionStatus::Submitted);
    model.updated_at = Set(Utc::now());
    let changed = model.update(&txn).await?;

    txn.commit().await?;

    info!(submission_id, "partner type changed");
    Ok(changed)
}
