//! Pairing business logic - creating, extending, approving, and dissolving study pairs.
//!
//! A user belongs to at most one confirmed pairing per batch. Uniqueness is
//! checked and the pairing written inside the same transaction. Pairs of
//! registered users are stored in canonical order (`user_1_id < user_2_id`).

use super::{auth::AuthContext, require_field};
use crate::{
    entities::{
        PairingStatus, PairingType, StudyPartner, Submission, SubmissionPairingStatus,
        SubmissionStatus, study_partner, submission,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Orders two user ids so the lexicographically smaller one comes first.
#[must_use]
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Partner kinds that are described by text instead of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalPartnerKind {
    /// Family member
    Family,
    /// External listening partner
    Tarteel,
}

impl From<ExternalPartnerKind> for PairingType {
    fn from(kind: ExternalPartnerKind) -> Self {
        match kind {
            ExternalPartnerKind::Family => Self::Family,
            ExternalPartnerKind::Tarteel => Self::Tarteel,
        }
    }
}

/// Descriptive details of an unregistered partner.
#[derive(Debug, Clone, Default)]
pub struct ExternalPartner {
    /// Partner's name
    pub name: String,
    /// Relationship to the student (family pairings)
    pub relationship: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Builds the `notes` text stored on a family or tarteel pairing.
#[must_use]
pub fn describe_external_partner(kind: ExternalPartnerKind, partner: &ExternalPartner) -> String {
    let label = match kind {
        ExternalPartnerKind::Family => "Family",
        ExternalPartnerKind::Tarteel => "Tarteel",
    };
    let mut text = format!("{label} pairing: {}", partner.name.trim());
    if let Some(relationship) = partner.relationship.as_deref().filter(|s| !s.trim().is_empty()) {
        text.push_str(&format!(" ({})", relationship.trim()));
    }
    if let Some(notes) = partner.notes.as_deref().filter(|s| !s.trim().is_empty()) {
        text.push_str(&format!(" - {}", notes.trim()));
    }
    text
}

/// Result of [`approve_self_match`].
#[derive(Debug, Clone, Serialize)]
pub struct SelfMatchApproval {
    /// The confirmed pairing
    pub pairing: study_partner::Model,
    /// True when the pairing already existed and only the confirmations changed
    pub already_paired: bool,
}

/// Finds a pairing by id.
pub async fn get_pairing<C>(db: &C, pairing_id: i64) -> Result<Option<study_partner::Model>>
where
    C: ConnectionTrait,
{
    StudyPartner::find_by_id(pairing_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the confirmed pairing of `batch_id` that has `user_id` in any slot.
pub async fn find_confirmed_pairing_for_user<C>(
    db: &C,
    user_id: &str,
    batch_id: &str,
) -> Result<Option<study_partner::Model>>
where
    C: ConnectionTrait,
{
    StudyPartner::find()
        .filter(study_partner::Column::BatchId.eq(batch_id))
        .filter(study_partner::Column::PairingStatus.is_in(PairingStatus::CONFIRMED))
        .filter(
            Condition::any()
                .add(study_partner::Column::User1Id.eq(user_id))
                .add(study_partner::Column::User2Id.eq(user_id))
                .add(study_partner::Column::User3Id.eq(user_id)),
        )
        .one(db)
        .await
        .map_err(Into::into)
}

/// Sets `pairing_status` on the user's confirmations for the batch.
pub(crate) async fn set_submission_pairing_status<C>(
    db: &C,
    user_id: &str,
    batch_id: &str,
    pairing_status: Option<SubmissionPairingStatus>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    Submission::update_many()
        .set(submission::ActiveModel {
            pairing_status: Set(pairing_status),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(submission::Column::UserId.eq(user_id))
        .filter(submission::Column::BatchId.eq(batch_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn approve_submissions_for<C>(db: &C, user_id: &str, batch_id: &str, reviewer: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    Submission::update_many()
        .set(submission::ActiveModel {
            status: Set(SubmissionStatus::Approved),
            pairing_status: Set(Some(SubmissionPairingStatus::Paired)),
            reviewed_by: Set(Some(reviewer.to_string())),
            reviewed_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(submission::Column::UserId.eq(user_id))
        .filter(submission::Column::BatchId.eq(batch_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn insert_registered_pair<C>(
    db: &C,
    actor: &AuthContext,
    user_a: &str,
    user_b: &str,
    batch_id: &str,
    pairing_type: PairingType,
) -> Result<study_partner::Model>
where
    C: ConnectionTrait,
{
    let (first, second) = canonical_pair(user_a, user_b);
    study_partner::ActiveModel {
        batch_id: Set(batch_id.to_string()),
        user_1_id: Set(first.to_string()),
        user_2_id: Set(Some(second.to_string())),
        user_3_id: Set(None),
        pairing_type: Set(pairing_type),
        pairing_status: Set(PairingStatus::Active),
        paired_by: Set(Some(actor.user_id.clone())),
        paired_at: Set(Some(Utc::now())),
        notes: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Marks `pairing` dissolved and clears the members' confirmation status.
pub(crate) async fn dissolve_in<C>(db: &C, pairing: study_partner::Model) -> Result<study_partner::Model>
where
    C: ConnectionTrait,
{
    let batch_id = pairing.batch_id.clone();
    let members: Vec<String> = pairing.members().into_iter().map(str::to_string).collect();

    let mut model: study_partner::ActiveModel = pairing.into();
    model.pairing_status = Set(PairingStatus::Dissolved);
    let dissolved = model.update(db).await?;

    for member in &members {
        set_submission_pairing_status(db, member, &batch_id, None).await?;
    }
    info!(pairing_id = dissolved.id, ?members, "pairing dissolved");
    Ok(dissolved)
}

/// Pairs two registered students chosen by an admin.
#[instrument(skip(db, actor), fields(caller = %actor.user_id))]
pub async fn create_system_match(
    db: &DatabaseConnection,
    actor: &AuthContext,
    user_1_id: &str,
    user_2_id: &str,
    batch_id: &str,
) -> Result<study_partner::Model> {
    require_field(user_1_id, "user_1_id")?;
    require_field(user_2_id, "user_2_id")?;
    require_field(batch_id, "batch_id")?;
    actor.require_admin()?;

    if user_1_id == user_2_id {
        return Err(Error::validation("Cannot pair user with themselves"));
    }

    let txn = db.begin().await?;

    for user_id in [user_1_id, user_2_id] {
        if let Some(existing) = find_confirmed_pairing_for_user(&txn, user_id, batch_id).await? {
            warn!(user_id, batch_id, pairing_id = existing.id, "user already paired");
            return Err(Error::PairingExists);
        }
    }

    let pairing = insert_registered_pair(
        &txn,
        actor,
        user_1_id,
        user_2_id,
        batch_id,
        PairingType::SystemMatch,
    )
    .await?;
    for user_id in [user_1_id, user_2_id] {
        set_submission_pairing_status(&txn, user_id, batch_id, Some(SubmissionPairingStatus::Paired))
            .await?;
    }

    txn.commit().await?;

    info!(pairing_id = pairing.id, batch_id, "system match created");
    Ok(pairing)
}

/// Expands a confirmed pair into a trio.
#[instrument(skip(db, actor), fields(caller = %actor.user_id))]
pub async fn add_third_member(
    db: &DatabaseConnection,
    actor: &AuthContext,
    pairing_id: i64,
    user_id: &str,
) -> Result<study_partner::Model> {
    require_field(user_id, "user_id")?;
    actor.require_admin()?;

    let txn = db.begin().await?;

    let pairing = get_pairing(&txn, pairing_id)
        .await?
        .filter(|p| p.pairing_status.is_confirmed())
        .ok_or_else(|| Error::PairingNotFound {
            id: pairing_id.to_string(),
        })?;

    if pairing.pairing_type.is_external() {
        return Err(Error::validation(
            "Cannot add members to a family or tarteel pairing",
        ));
    }
    if pairing.user_3_id.is_some() {
        return Err(Error::PairFull);
    }
    if pairing.has_member(user_id) {
        return Err(Error::AlreadyInPair);
    }
    if find_confirmed_pairing_for_user(&txn, user_id, &pairing.batch_id)
        .await?
        .is_some()
    {
        return Err(Error::PairedElsewhere);
    }

    let batch_id = pairing.batch_id.clone();
    let mut model: study_partner::ActiveModel = pairing.into();
    model.user_3_id = Set(Some(user_id.to_string()));
    let updated = model.update(&txn).await?;
    set_submission_pairing_status(&txn, user_id, &batch_id, Some(SubmissionPairingStatus::Paired))
        .await?;

    txn.commit().await?;

    info!(pairing_id, user_id, "third member added");
    Ok(updated)
}

/// Approves a family or tarteel request whose partner has no account.
///
/// The submission becomes `approved` and a pairing with an empty second slot
/// is recorded, describing the partner in its notes.
#[instrument(skip(db, actor, partner), fields(caller = %actor.user_id))]
pub async fn approve_external_match(
    db: &DatabaseConnection,
    actor: &AuthContext,
    kind: ExternalPartnerKind,
    submission_id: i64,
    user_id: &str,
    partner: ExternalPartner,
) -> Result<study_partner::Model> {
    require_field(user_id, "user_id")?;
    require_field(&partner.name, "partner_name")?;
    actor.require_admin()?;

    let txn = db.begin().await?;

    let found = Submission::find_by_id(submission_id)
        .one(&txn)
        .await?
        .ok_or(Error::SubmissionNotFound { id: submission_id })?;
    if found.user_id != user_id {
        return Err(Error::validation("Submission does not belong to this user"));
    }
    let expected = PairingType::from(kind);
    if found.partner_type != expected {
        return Err(Error::validation(format!(
            "Submission is not a {} request",
            expected.as_str()
        )));
    }
    if find_confirmed_pairing_for_user(&txn, user_id, &found.batch_id)
        .await?
        .is_some()
    {
        return Err(Error::PairedElsewhere);
    }

    let now = Utc::now();
    let batch_id = found.batch_id.clone();
    let mut model: submission::ActiveModel = found.into();
    model.status = Set(SubmissionStatus::Approved);
    model.pairing_status = Set(Some(SubmissionPairingStatus::Paired));
    model.reviewed_by = Set(Some(actor.user_id.clone()));
    model.reviewed_at = Set(Some(now));
    model.updated_at = Set(now);
    model.update(&txn).await?;

    let pairing = study_partner::ActiveModel {
        batch_id: Set(batch_id),
        user_1_id: Set(user_id.to_string()),
        user_2_id: Set(None),
        user_3_id: Set(None),
        pairing_type: Set(kind.into()),
        pairing_status: Set(PairingStatus::Active),
        paired_by: Set(Some(actor.user_id.clone())),
        paired_at: Set(Some(now)),
        notes: Set(Some(describe_external_partner(kind, &partner))),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(pairing_id = pairing.id, submission_id, ?kind, "external partner approved");
    Ok(pairing)
}

/// Approves a self-declared pair of registered students.
///
/// If the two are already paired together only the confirmations are
/// approved; if either is paired with someone else the request fails.
#[instrument(skip(db, actor), fields(caller = %actor.user_id))]
pub async fn approve_self_match(
    db: &DatabaseConnection,
    actor: &AuthContext,
    submission_id: i64,
    user_1_id: &str,
    user_2_id: &str,
) -> Result<SelfMatchApproval> {
    require_field(user_1_id, "user_1_id")?;
    require_field(user_2_id, "user_2_id")?;
    actor.require_admin()?;

    if user_1_id == user_2_id {
        return Err(Error::validation("Cannot pair user with themselves"));
    }

    let txn = db.begin().await?;

    let found = Submission::find_by_id(submission_id)
        .one(&txn)
        .await?
        .ok_or(Error::SubmissionNotFound { id: submission_id })?;
    if found.partner_type != PairingType::SelfMatch {
        return Err(Error::validation("Submission is not a self_match request"));
    }
    let batch_id = found.batch_id;

    let first = find_confirmed_pairing_for_user(&txn, user_1_id, &batch_id).await?;
    let second = find_confirmed_pairing_for_user(&txn, user_2_id, &batch_id).await?;

    let (pairing, already_paired) = match (first, second) {
        (Some(a), Some(b)) if a.id == b.id => (a, true),
        (None, None) => {
            let created = insert_registered_pair(
                &txn,
                actor,
                user_1_id,
                user_2_id,
                &batch_id,
                PairingType::SelfMatch,
            )
            .await?;
            (created, false)
        }
        _ => return Err(Error::PairingExists),
    };

    for user_id in [user_1_id, user_2_id] {
        approve_submissions_for(&txn, user_id, &batch_id, &actor.user_id).await?;
    }

    txn.commit().await?;

    info!(pairing_id = pairing.id, already_paired, "self match approved");
    Ok(SelfMatchApproval {
        pairing,
        already_paired,
    })
}

/// Dissolves the user's confirmed pairing in the batch, freeing every member
/// for re-matching. The row is kept with status `dissolved`.
#[instrument(skip(db, actor), fields(caller = %actor.user_id))]
pub async fn dissolve_pairing(
    db: &DatabaseConnection,
    actor: &AuthContext,
    user_id: &str,
    batch_id: &str,
) -> Result<study_partner::Model> {
    require_field(user_id, "user_id")?;
    require_field(batch_id, "batch_id")?;
    actor.require_admin()?;

    let txn = db.begin().await?;
    let pairing = find_confirmed_pairing_for_user(&txn, user_id, batch_id)
        .await?
        .ok_or_else(|| Error::PairingNotFound {
            id: format!("user {user_id} in batch {batch_id}"),
        })?;
    let dissolved = dissolve_in(&txn, pairing).await?;
    txn.commit().await?;

    Ok(dissolved)
}

/// Returns the user's confirmed pairing in the batch. Students may only look
/// up their own.
pub async fn get_pairing_for_user(
    db: &DatabaseConnection,
    actor: &AuthContext,
    user_id: &str,
    batch_id: &str,
) -> Result<study_partner::Model> {
    require_field(user_id, "user_id")?;
    require_field(batch_id, "batch_id")?;
    actor.require_self_or_admin(user_id)?;

    find_confirmed_pairing_for_user(db, user_id, batch_id)
        .await?
        .ok_or_else(|| Error::PairingNotFound {
            id: format!("user {user_id} in batch {batch_id}"),
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    const BATCH: &str = "batch-2";

    async fn confirmed_count(db: &DatabaseConnection, user_id: &str, batch_id: &str) -> Result<usize> {
        let rows = StudyPartner::find()
            .filter(study_partner::Column::BatchId.eq(batch_id))
            .filter(study_partner::Column::PairingStatus.is_in(PairingStatus::CONFIRMED))
            .all(db)
            .await?;
        Ok(rows.iter().filter(|p| p.has_member(user_id)).count())
    }

    #[test]
    fn test_canonical_pair() {
        assert_eq!(canonical_pair("alice", "bob"), ("alice", "bob"));
        assert_eq!(canonical_pair("bob", "alice"), ("alice", "bob"));
    }

    #[test]
    fn test_describe_external_partner() {
        let partner = ExternalPartner {
            name: "Aminah".to_string(),
            relationship: Some("Mother".to_string()),
            notes: Some("Evenings only".to_string()),
        };
        assert_eq!(
            describe_external_partner(ExternalPartnerKind::Family, &partner),
            "Family pairing: Aminah (Mother) - Evenings only"
        );

        let bare = ExternalPartner {
            name: "Zaid".to_string(),
            relationship: Some("  ".to_string()),
            notes: None,
        };
        assert_eq!(
            describe_external_partner(ExternalPartnerKind::Tarteel, &bare),
            "Tarteel pairing: Zaid"
        );
    }

    #[tokio::test]
    async fn test_create_system_match_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_system_match(&db, &admin(), "a", "a", BATCH).await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));

        let result = create_system_match(&db, &admin(), "a", "", BATCH).await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));

        let result = create_system_match(&db, &student("a"), "a", "b", BATCH).await;
        assert!(matches!(result, Err(Error::Forbidden { message: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_system_match_is_canonical_in_either_order() -> Result<()> {
        let db = setup_test_db().await?;
        let forward = create_system_match(&db, &admin(), "alice", "bob", BATCH).await?;
        assert_eq!(forward.user_1_id, "alice");
        assert_eq!(forward.user_2_id.as_deref(), Some("bob"));
        assert_eq!(forward.pairing_type, PairingType::SystemMatch);
        assert_eq!(forward.pairing_status, PairingStatus::Active);
        assert_eq!(forward.paired_by.as_deref(), Some(ADMIN_ID));

        let other = setup_test_db().await?;
        let reverse = create_system_match(&other, &admin(), "bob", "alice", BATCH).await?;
        assert_eq!(
            (reverse.user_1_id.as_str(), reverse.user_2_id.as_deref()),
            (forward.user_1_id.as_str(), forward.user_2_id.as_deref())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_system_match_marks_submissions_paired() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_submission(&db, "a", BATCH, PairingType::SystemMatch).await?;
        let b = create_test_submission(&db, "b", BATCH, PairingType::SystemMatch).await?;

        create_system_match(&db, &admin(), "a", "b", BATCH).await?;

        for id in [a.id, b.id] {
            let s = Submission::find_by_id(id).one(&db).await?.unwrap();
            assert_eq!(s.pairing_status, Some(SubmissionPairingStatus::Paired));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_system_match_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_system_match(&db, &admin(), "A", "B", BATCH).await?;

        let result = create_system_match(&db, &admin(), "A", "D", BATCH).await;
        assert!(matches!(result, Err(Error::PairingExists)));
        let result = create_system_match(&db, &admin(), "D", "B", BATCH).await;
        assert!(matches!(result, Err(Error::PairingExists)));
        assert_eq!(confirmed_count(&db, "D", BATCH).await?, 0);

        // Uniqueness is per batch
        create_system_match(&db, &admin(), "A", "D", "batch-3").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_add_third_member() -> Result<()> {
        let db = setup_test_db().await?;
        let c_sub = create_test_submission(&db, "C", BATCH, PairingType::SystemMatch).await?;
        let pair = create_system_match(&db, &admin(), "A", "B", BATCH).await?;

        let trio = add_third_member(&db, &admin(), pair.id, "C").await?;
        assert_eq!(trio.user_1_id, "A");
        assert_eq!(trio.user_2_id.as_deref(), Some("B"));
        assert_eq!(trio.user_3_id.as_deref(), Some("C"));

        let s = Submission::find_by_id(c_sub.id).one(&db).await?.unwrap();
        assert_eq!(s.pairing_status, Some(SubmissionPairingStatus::Paired));

        let result = add_third_member(&db, &admin(), pair.id, "E").await;
        assert!(matches!(result, Err(Error::PairFull)));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_third_member_preconditions() -> Result<()> {
        let db = setup_test_db().await?;
        let pair = create_system_match(&db, &admin(), "A", "B", BATCH).await?;
        create_system_match(&db, &admin(), "X", "Y", BATCH).await?;

        let result = add_third_member(&db, &admin(), pair.id, "B").await;
        assert!(matches!(result, Err(Error::AlreadyInPair)));

        let result = add_third_member(&db, &admin(), pair.id, "X").await;
        assert!(matches!(result, Err(Error::PairedElsewhere)));

        let result = add_third_member(&db, &admin(), 4242, "Z").await;
        assert!(matches!(result, Err(Error::PairingNotFound { id: _ })));

        let result = add_third_member(&db, &student("Z"), pair.id, "Z").await;
        assert!(matches!(result, Err(Error::Forbidden { message: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_family_match() -> Result<()> {
        let db = setup_test_db().await?;
        let sub = create_test_submission(&db, "F", BATCH, PairingType::Family).await?;
        let partner = ExternalPartner {
            name: "Fatimah".to_string(),
            relationship: Some("Sister".to_string()),
            notes: None,
        };

        let pairing =
            approve_external_match(&db, &admin(), ExternalPartnerKind::Family, sub.id, "F", partner)
                .await?;
        assert_eq!(pairing.user_1_id, "F");
        assert!(pairing.user_2_id.is_none());
        assert_eq!(pairing.pairing_type, PairingType::Family);
        assert_eq!(pairing.notes.as_deref(), Some("Family pairing: Fatimah (Sister)"));

        let s = Submission::find_by_id(sub.id).one(&db).await?.unwrap();
        assert_eq!(s.status, SubmissionStatus::Approved);
        assert_eq!(s.pairing_status, Some(SubmissionPairingStatus::Paired));
        assert_eq!(s.reviewed_by.as_deref(), Some(ADMIN_ID));

        // A second approval would give the user two confirmed pairings
        let again = approve_external_match(
            &db,
            &admin(),
            ExternalPartnerKind::Family,
            sub.id,
            "F",
            ExternalPartner {
                name: "Other".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(again, Err(Error::PairedElsewhere)));
        assert_eq!(confirmed_count(&db, "F", BATCH).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_external_match_preconditions() -> Result<()> {
        let db = setup_test_db().await?;
        let sub = create_test_submission(&db, "T", BATCH, PairingType::Tarteel).await?;

        let result = approve_external_match(
            &db,
            &admin(),
            ExternalPartnerKind::Tarteel,
            sub.id,
            "T",
            ExternalPartner::default(),
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));

        let named = ExternalPartner {
            name: "Ustadzah".to_string(),
            ..Default::default()
        };
        let result = approve_external_match(
            &db,
            &admin(),
            ExternalPartnerKind::Tarteel,
            999,
            "T",
            named.clone(),
        )
        .await;
        assert!(matches!(result, Err(Error::SubmissionNotFound { id: 999 })));

        let result =
            approve_external_match(&db, &admin(), ExternalPartnerKind::Tarteel, sub.id, "U", named)
                .await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_external_match_requires_matching_partner_type() -> Result<()> {
        let db = setup_test_db().await?;
        let sub = create_test_submission(&db, "F", BATCH, PairingType::Family).await?;
        let named = ExternalPartner {
            name: "Ustadzah".to_string(),
            ..Default::default()
        };

        let result =
            approve_external_match(&db, &admin(), ExternalPartnerKind::Tarteel, sub.id, "F", named)
                .await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));

        let s = Submission::find_by_id(sub.id).one(&db).await?.unwrap();
        assert_eq!(s.status, sub.status);
        assert_eq!(s.partner_type, PairingType::Family);
        assert_eq!(confirmed_count(&db, "F", BATCH).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_self_match() -> Result<()> {
        let db = setup_test_db().await?;
        let sub = create_test_submission(&db, "zed", BATCH, PairingType::SelfMatch).await?;
        let partner_sub = create_test_submission(&db, "amy", BATCH, PairingType::SelfMatch).await?;

        let first = approve_self_match(&db, &admin(), sub.id, "zed", "amy").await?;
        assert!(!first.already_paired);
        assert_eq!(first.pairing.user_1_id, "amy");
        assert_eq!(first.pairing.pairing_type, PairingType::SelfMatch);

        for id in [sub.id, partner_sub.id] {
            let s = Submission::find_by_id(id).one(&db).await?.unwrap();
            assert_eq!(s.status, SubmissionStatus::Approved);
            assert_eq!(s.pairing_status, Some(SubmissionPairingStatus::Paired));
        }

        // Approving the partner's request for the same pair is a no-op on pairings
        let second = approve_self_match(&db, &admin(), partner_sub.id, "amy", "zed").await?;
        assert!(second.already_paired);
        assert_eq!(second.pairing.id, first.pairing.id);

        // One of them with a third person conflicts
        let third = create_test_submission(&db, "bob", BATCH, PairingType::SelfMatch).await?;
        let result = approve_self_match(&db, &admin(), third.id, "bob", "amy").await;
        assert!(matches!(result, Err(Error::PairingExists)));
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_self_match_requires_self_match_submission() -> Result<()> {
        let db = setup_test_db().await?;
        let sub = create_test_submission(&db, "a", BATCH, PairingType::Family).await?;
        let result = approve_self_match(&db, &admin(), sub.id, "a", "b").await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_dissolve_frees_members() -> Result<()> {
        let db = setup_test_db().await?;
        let a_sub = create_test_submission(&db, "A", BATCH, PairingType::SystemMatch).await?;
        let pair = create_system_match(&db, &admin(), "A", "B", BATCH).await?;
        add_third_member(&db, &admin(), pair.id, "C").await?;

        let dissolved = dissolve_pairing(&db, &admin(), "C", BATCH).await?;
        assert_eq!(dissolved.id, pair.id);
        assert_eq!(dissolved.pairing_status, PairingStatus::Dissolved);

        let s = Submission::find_by_id(a_sub.id).one(&db).await?.unwrap();
        assert_eq!(s.pairing_status, None);

        // Row is kept, and the members can be paired again
        assert!(get_pairing(&db, pair.id).await?.is_some());
        create_system_match(&db, &admin(), "A", "C", BATCH).await?;

        let result = dissolve_pairing(&db, &admin(), "B", BATCH).await;
        assert!(matches!(result, Err(Error::PairingNotFound { id: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_pairing_for_user() -> Result<()> {
        let db = setup_test_db().await?;
        let pair = create_system_match(&db, &admin(), "A", "B", BATCH).await?;

        let found = get_pairing_for_user(&db, &student("B"), "B", BATCH).await?;
        assert_eq!(found.id, pair.id);

        let result = get_pairing_for_user(&db, &student("B"), "A", BATCH).await;
        assert!(matches!(result, Err(Error::Forbidden { message: _ })));

        let result = get_pairing_for_user(&db, &admin(), "A", "other-batch").await;
        assert!(matches!(result, Err(Error::PairingNotFound { id: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_one_confirmed_pairing_per_user_per_batch() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let users = ["u1", "u2", "u3", "u4", "u5"];

        // Every attempt, successful or not, must leave the invariant intact
        let _ = create_system_match(&db, &admin(), "u1", "u2", BATCH).await;
        let _ = create_system_match(&db, &admin(), "u2", "u3", BATCH).await;
        let _ = create_system_match(&db, &admin(), "u3", "u4", BATCH).await;
        let pair = find_confirmed_pairing_for_user(&db, "u1", BATCH).await?.unwrap();
        let _ = add_third_member(&db, &admin(), pair.id, "u3").await;
        let _ = add_third_member(&db, &admin(), pair.id, "u5").await;
        let _ = create_system_match(&db, &admin(), "u5", "u4", BATCH).await;

        for user in users {
            assert!(confirmed_count(&db, user, BATCH).await? <= 1, "{user} paired twice");
        }
        Ok(())
    }
}
