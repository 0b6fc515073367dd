use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use matchslot_core::domain::notification::{
    NewNotification, Notification, NotificationId, NotificationKind, RecipientRole,
};
use matchslot_core::domain::offer::OfferId;
use matchslot_core::domain::slot::SlotId;
use matchslot_core::store::{NotificationOutbox, StoreError};

use super::{backend, decode, fmt_ts, new_row_id, parse_opt_ts, parse_ts};
use crate::DbPool;

pub struct SqlNotificationOutbox {
    pool: DbPool,
}

impl SqlNotificationOutbox {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const NOTIFICATION_COLUMNS: &str = "id, recipient_email, recipient_type, notification_type, \
     match_offer_id, slot_id, subject, body, sent, sent_at, created_at";

fn row_to_notification(row: &SqliteRow) -> Result<Notification, StoreError> {
    let role_str: String = row.try_get("recipient_type").map_err(|e| decode(e.to_string()))?;
    let kind_str: String =
        row.try_get("notification_type").map_err(|e| decode(e.to_string()))?;
    let slot_id: Option<String> = row.try_get("slot_id").map_err(|e| decode(e.to_string()))?;
    let sent: i64 = row.try_get("sent").map_err(|e| decode(e.to_string()))?;
    let sent_at: Option<String> = row.try_get("sent_at").map_err(|e| decode(e.to_string()))?;
    let created_at: String = row.try_get("created_at").map_err(|e| decode(e.to_string()))?;

    Ok(Notification {
        id: NotificationId(row.try_get("id").map_err(|e| decode(e.to_string()))?),
        recipient_email: row.try_get("recipient_email").map_err(|e| decode(e.to_string()))?,
        recipient_role: RecipientRole::parse(&role_str)
            .ok_or_else(|| decode(format!("unknown recipient type `{role_str}`")))?,
        kind: NotificationKind::parse(&kind_str)
            .ok_or_else(|| decode(format!("unknown notification type `{kind_str}`")))?,
        offer_id: OfferId(row.try_get("match_offer_id").map_err(|e| decode(e.to_string()))?),
        slot_id: slot_id.map(SlotId),
        subject: row.try_get("subject").map_err(|e| decode(e.to_string()))?,
        body: row.try_get("body").map_err(|e| decode(e.to_string()))?,
        sent: sent != 0,
        sent_at: parse_opt_ts(sent_at, "sent_at")?,
        created_at: parse_ts(&created_at, "created_at")?,
    })
}

#[async_trait]
impl NotificationOutbox for SqlNotificationOutbox {
    async fn enqueue(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        let now = Utc::now();
        let id = new_row_id();

        sqlx::query(
            "INSERT INTO notifications (id, recipient_email, recipient_type, \
             notification_type, match_offer_id, slot_id, subject, body, sent, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&notification.recipient_email)
        .bind(notification.recipient_role.as_str())
        .bind(notification.kind.as_str())
        .bind(&notification.offer_id.0)
        .bind(notification.slot_id.as_ref().map(|slot| slot.0.as_str()))
        .bind(&notification.subject)
        .bind(&notification.body)
        .bind(fmt_ts(now))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Notification {
            id: NotificationId(id),
            recipient_email: notification.recipient_email,
            recipient_role: notification.recipient_role,
            kind: notification.kind,
            offer_id: notification.offer_id,
            slot_id: notification.slot_id,
            subject: notification.subject,
            body: notification.body,
            sent: false,
            sent_at: None,
            created_at: now,
        })
    }

    async fn unsent(&self, limit: u32) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE sent = 0 ORDER BY created_at ASC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_sent(&self, id: &NotificationId, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET sent = 1, sent_at = ? WHERE id = ? AND sent = 0",
        )
        .bind(fmt_ts(at))
        .bind(&id.0)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn for_offer(&self, offer_id: &OfferId) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE match_offer_id = ? ORDER BY created_at ASC"
        ))
        .bind(&offer_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(row_to_notification).collect()
    }
}
