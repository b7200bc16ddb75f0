//! Pairing statistics for the admin dashboard.

use super::{auth::AuthContext, require_field};
use crate::{
    entities::{PairingType, Submission, SubmissionStatus, submission},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Submitted and approved counts for one partner type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    /// Users whose latest confirmation is awaiting review
    pub submitted: u64,
    /// Users whose latest confirmation was approved
    pub approved: u64,
}

/// Per-type counts of unique users in a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingStatistics {
    /// Users whose latest confirmation names a registered partner
    pub self_match: TypeCounts,
    /// Users waiting to be matched by an admin
    pub system_match: TypeCounts,
    /// Users paired with an external listening partner
    pub tarteel: TypeCounts,
    /// Users paired with a family member
    pub family: TypeCounts,
}

impl PairingStatistics {
    fn counts_mut(&mut self, partner_type: PairingType) -> &mut TypeCounts {
        match partner_type {
            PairingType::SelfMatch => &mut self.self_match,
            PairingType::SystemMatch => &mut self.system_match,
            PairingType::Tarteel => &mut self.tarteel,
            PairingType::Family => &mut self.family,
        }
    }
}

/// Tallies confirmations ordered newest first, counting only the first
/// (latest) row seen for each user.
#[must_use]
pub fn tally<'a>(newest_first: impl IntoIterator<Item = &'a submission::Model>) -> PairingStatistics {
    let mut seen = HashSet::new();
    let mut stats = PairingStatistics::default();

    for row in newest_first {
        if !seen.insert(row.user_id.as_str()) {
            continue;
        }
        let counts = stats.counts_mut(row.partner_type);
        match row.status {
            SubmissionStatus::Submitted => counts.submitted += 1,
            SubmissionStatus::Approved => counts.approved += 1,
            SubmissionStatus::Draft | SubmissionStatus::Rejected => {}
        }
    }
    stats
}

/// Counts, per partner type, the users of `batch_id` whose latest
/// confirmation is submitted or approved.
pub async fn pairing_statistics(
    db: &DatabaseConnection,
    actor: &AuthContext,
    batch_id: &str,
) -> Result<PairingStatistics> {
    require_field(batch_id, "batch_id")?;
    actor.require_admin()?;

    let rows = Submission::find()
        .filter(submission::Column::BatchId.eq(batch_id))
        .order_by_desc(submission::Column::CreatedAt)
        .order_by_desc(submission::Column::Id)
        .all(db)
        .await?;

    debug!(batch_id, rows = rows.len(), "computing pairing statistics");
    Ok(tally(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::test_utils::*;
    use chrono::{Duration, Utc};
    use sea_orm::Set;

    const BATCH: &str = "batch-2";

    async fn set_status(
        db: &DatabaseConnection,
        row: submission::Model,
        status: SubmissionStatus,
        age_days: i64,
    ) -> Result<submission::Model> {
        let mut model: submission::ActiveModel = row.into();
        model.status = Set(status);
        model.created_at = Set(Utc::now() - Duration::days(age_days));
        model.update(db).await.map_err(Into::into)
    }

    #[tokio::test]
    async fn test_statistics_count_latest_per_user() -> Result<()> {
        let db = setup_test_db().await?;

        // u1: an older family request superseded by an approved self match
        let old = create_test_submission(&db, "u1", BATCH, PairingType::Family).await?;
        set_status(&db, old, SubmissionStatus::Submitted, 3).await?;
        let new = create_test_submission(&db, "u1", BATCH, PairingType::SelfMatch).await?;
        set_status(&db, new, SubmissionStatus::Approved, 1).await?;

        let u2 = create_test_submission(&db, "u2", BATCH, PairingType::SystemMatch).await?;
        set_status(&db, u2, SubmissionStatus::Submitted, 1).await?;
        let u3 = create_test_submission(&db, "u3", BATCH, PairingType::Tarteel).await?;
        set_status(&db, u3, SubmissionStatus::Draft, 1).await?;
        let other = create_test_submission(&db, "u4", "batch-9", PairingType::Family).await?;
        set_status(&db, other, SubmissionStatus::Approved, 1).await?;

        let stats = pairing_statistics(&db, &admin(), BATCH).await?;
        assert_eq!(stats.self_match, TypeCounts { submitted: 0, approved: 1 });
        assert_eq!(stats.family, TypeCounts::default());
        assert_eq!(stats.system_match, TypeCounts { submitted: 1, approved: 0 });
        assert_eq!(stats.tarteel, TypeCounts::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_statistics_one_field_per_partner_type() -> Result<()> {
        let db = setup_test_db().await?;
        let kinds = [
            ("a", PairingType::SelfMatch),
            ("b", PairingType::SystemMatch),
            ("c", PairingType::Tarteel),
            ("d", PairingType::Family),
        ];
        for (user, kind) in kinds {
            let row = create_test_submission(&db, user, BATCH, kind).await?;
            set_status(&db, row, SubmissionStatus::Submitted, 1).await?;
        }

        let stats = pairing_statistics(&db, &admin(), BATCH).await?;
        let one = TypeCounts { submitted: 1, approved: 0 };
        assert_eq!(stats.self_match, one);
        assert_eq!(stats.system_match, one);
        assert_eq!(stats.tarteel, one);
        assert_eq!(stats.family, one);
        Ok(())
    }

    #[tokio::test]
    async fn test_statistics_requires_admin() -> Result<()> {
        let db = setup_test_db().await?;
        let result = pairing_statistics(&db, &student("u1"), BATCH).await;
        assert!(matches!(result, Err(Error::Forbidden { message: _ })));

        let result = pairing_statistics(&db, &admin(), " ").await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));
        Ok(())
    }

    #[test]
    fn test_statistics_serialize_camel_case() {
        let stats = PairingStatistics {
            self_match: TypeCounts {
                submitted: 2,
                approved: 1,
            },
            ..Default::default()
        };
        let json = serde_json::to_value(stats).unwrap_or_default();
        assert_eq!(json["selfMatch"]["submitted"], 2);
        assert_eq!(json["systemMatch"]["approved"], 0);
        assert!(json.get("self_match").is_none());
    }
}
