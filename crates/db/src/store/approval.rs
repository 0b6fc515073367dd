use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use matchslot_core::domain::approval::{Approval, ApprovalId, ApprovalStatus};
use matchslot_core::domain::offer::OfferId;
use matchslot_core::domain::slot::SlotId;
use matchslot_core::store::{ApprovalStore, NewApproval, StoreError};

use super::{backend, decode, fmt_ts, new_row_id, parse_opt_ts, parse_ts};
use crate::DbPool;

pub struct SqlApprovalStore {
    pool: DbPool,
}

impl SqlApprovalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const APPROVAL_COLUMNS: &str = "id, match_offer_id, slot_id, approval_token, approver_email, \
     status, decision_at, decision_notes, created_at";

fn row_to_approval(row: &SqliteRow) -> Result<Approval, StoreError> {
    let status_str: String = row.try_get("status").map_err(|e| decode(e.to_string()))?;
    let decision_at: Option<String> =
        row.try_get("decision_at").map_err(|e| decode(e.to_string()))?;
    let created_at: String = row.try_get("created_at").map_err(|e| decode(e.to_string()))?;
    let slot_id: Option<String> = row.try_get("slot_id").map_err(|e| decode(e.to_string()))?;

    Ok(Approval {
        id: ApprovalId(row.try_get("id").map_err(|e| decode(e.to_string()))?),
        offer_id: OfferId(row.try_get("match_offer_id").map_err(|e| decode(e.to_string()))?),
        slot_id: slot_id.map(SlotId),
        approval_token: row.try_get("approval_token").map_err(|e| decode(e.to_string()))?,
        approver_email: row.try_get("approver_email").map_err(|e| decode(e.to_string()))?,
        status: ApprovalStatus::parse(&status_str)
            .ok_or_else(|| decode(format!("unknown approval status `{status_str}`")))?,
        decision_at: parse_opt_ts(decision_at, "decision_at")?,
        decision_notes: row.try_get("decision_notes").map_err(|e| decode(e.to_string()))?,
        created_at: parse_ts(&created_at, "created_at")?,
    })
}

#[async_trait]
impl ApprovalStore for SqlApprovalStore {
    async fn insert_approval(&self, approval: NewApproval) -> Result<Approval, StoreError> {
        let now = Utc::now();
        let id = new_row_id();

        sqlx::query(
            "INSERT INTO approvals (id, match_offer_id, slot_id, approval_token, \
             approver_email, status, created_at)
             VALUES (?, ?, ?, ?, ?, 'PENDING', ?)",
        )
        .bind(&id)
        .bind(&approval.offer_id.0)
        .bind(approval.slot_id.as_ref().map(|slot| slot.0.as_str()))
        .bind(&approval.approval_token)
        .bind(&approval.approver_email)
        .bind(fmt_ts(now))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Approval {
            id: ApprovalId(id),
            offer_id: approval.offer_id,
            slot_id: approval.slot_id,
            approval_token: approval.approval_token,
            approver_email: approval.approver_email,
            status: ApprovalStatus::Pending,
            decision_at: None,
            decision_notes: None,
            created_at: now,
        })
    }

    async fn approval_by_token(&self, token: &str) -> Result<Option<Approval>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approvals WHERE approval_token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(row_to_approval).transpose()
    }

    async fn pending_offer_approval(
        &self,
        offer_id: &OfferId,
    ) -> Result<Option<Approval>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approvals \
             WHERE match_offer_id = ? AND slot_id IS NULL AND status = 'PENDING' \
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(&offer_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(row_to_approval).transpose()
    }

    async fn pending_slot_approvals(
        &self,
        offer_id: &OfferId,
    ) -> Result<Vec<Approval>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approvals \
             WHERE match_offer_id = ? AND slot_id IS NOT NULL AND status = 'PENDING' \
             ORDER BY created_at ASC"
        ))
        .bind(&offer_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(row_to_approval).collect()
    }

    async fn resolve_approval(
        &self,
        token: &str,
        decision: ApprovalStatus,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE approvals SET status = ?, decision_at = ?, decision_notes = ? \
             WHERE approval_token = ? AND status = 'PENDING'",
        )
        .bind(decision.as_str())
        .bind(fmt_ts(at))
        .bind(notes)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use matchslot_core::domain::approval::ApprovalStatus;
    use matchslot_core::domain::offer::OfferId;
    use matchslot_core::domain::slot::SlotId;
    use matchslot_core::store::{ApprovalStore, NewApproval, StoreError};

    use super::SqlApprovalStore;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlApprovalStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlApprovalStore::new(pool)
    }

    fn new_approval(token: &str, slot: Option<&str>) -> NewApproval {
        NewApproval {
            offer_id: OfferId("offer-1".to_string()),
            slot_id: slot.map(|slot| SlotId(slot.to_string())),
            approval_token: token.to_string(),
            approver_email: "approver@club.example".to_string(),
        }
    }

    #[tokio::test]
    async fn approvals_round_trip_by_token() {
        let store = setup().await;
        store.insert_approval(new_approval("tok-1", None)).await.expect("insert");

        let found = store.approval_by_token("tok-1").await.expect("read").expect("exists");
        assert_eq!(found.status, ApprovalStatus::Pending);
        assert!(found.slot_id.is_none());
        assert!(store.approval_by_token("tok-x").await.expect("read").is_none());
    }

    #[tokio::test]
    async fn tokens_are_unique_per_category() {
        let store = setup().await;
        store.insert_approval(new_approval("tok-1", None)).await.expect("insert");

        let error = store
            .insert_approval(new_approval("tok-1", Some("slot-1")))
            .await
            .expect_err("duplicate token");
        assert!(matches!(error, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn pending_lookups_split_offer_and_slot_levels() {
        let store = setup().await;
        store.insert_approval(new_approval("tok-offer", None)).await.expect("insert");
        store.insert_approval(new_approval("tok-slot-a", Some("slot-a"))).await.expect("insert");
        store.insert_approval(new_approval("tok-slot-b", Some("slot-b"))).await.expect("insert");

        let offer_id = OfferId("offer-1".to_string());
        let offer_level =
            store.pending_offer_approval(&offer_id).await.expect("read").expect("exists");
        assert_eq!(offer_level.approval_token, "tok-offer");

        let slot_level = store.pending_slot_approvals(&offer_id).await.expect("read");
        assert_eq!(slot_level.len(), 2);
        assert!(slot_level.iter().all(|approval| approval.slot_id.is_some()));
    }

    #[tokio::test]
    async fn resolution_is_single_use() {
        let store = setup().await;
        store.insert_approval(new_approval("tok-1", None)).await.expect("insert");
        let now = Utc::now();

        let first = store
            .resolve_approval("tok-1", ApprovalStatus::Rejected, Some("insufficient info"), now)
            .await
            .expect("resolve");
        assert_eq!(first, 1);

        let second = store
            .resolve_approval("tok-1", ApprovalStatus::Approved, None, now)
            .await
            .expect("resolve again");
        assert_eq!(second, 0, "a resolved token must not flip");

        let stored = store.approval_by_token("tok-1").await.expect("read").expect("exists");
        assert_eq!(stored.status, ApprovalStatus::Rejected);
        assert_eq!(stored.decision_notes.as_deref(), Some("insufficient info"));
        assert!(stored.decision_at.is_some());
    }
}
