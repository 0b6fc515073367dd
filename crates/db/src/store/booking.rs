use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use matchslot_core::domain::notification::NewNotification;
use matchslot_core::domain::offer::{
    AgeGroup, MatchFormat, MatchOffer, OfferId, OfferStatus, OfferWithSlots,
};
use matchslot_core::domain::slot::{
    GuestDetails, MatchResult, RecordedResult, Slot, SlotId, SlotStatus,
};
use matchslot_core::store::{
    BookingCascade, BookingStore, NewOffer, NewSlot, StoreError,
};

use super::{backend, decode, fmt_ts, new_row_id, parse_opt_ts, parse_ts};
use crate::DbPool;

pub struct SqlBookingStore {
    pool: DbPool,
}

impl SqlBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const OFFER_COLUMNS: &str = "id, host_name, host_club, host_contact, age_group, format, \
     duration_minutes, location, notes, approver_email, status, share_token, \
     created_at, updated_at";

const SLOT_COLUMNS: &str = "id, match_offer_id, start_time, end_time, status, held_by_session, \
     held_at, guest_name, guest_club, guest_contact, guest_notes, home_score, away_score, \
     result_notes, result_saved_at, created_at, updated_at";

fn get_text(row: &SqliteRow, column: &str) -> Result<String, StoreError> {
    row.try_get(column).map_err(|e| decode(e.to_string()))
}

fn get_opt_text(row: &SqliteRow, column: &str) -> Result<Option<String>, StoreError> {
    row.try_get(column).map_err(|e| decode(e.to_string()))
}

fn offer_status_list(expected: &[OfferStatus]) -> String {
    expected.iter().map(|s| format!("'{}'", s.as_str())).collect::<Vec<_>>().join(", ")
}

fn slot_status_list(expected: &[SlotStatus]) -> String {
    expected.iter().map(|s| format!("'{}'", s.as_str())).collect::<Vec<_>>().join(", ")
}

fn row_to_offer(row: &SqliteRow) -> Result<MatchOffer, StoreError> {
    let age_group_str = get_text(row, "age_group")?;
    let format_str = get_text(row, "format")?;
    let status_str = get_text(row, "status")?;
    let duration: i64 = row.try_get("duration_minutes").map_err(|e| decode(e.to_string()))?;

    Ok(MatchOffer {
        id: OfferId(get_text(row, "id")?),
        host_name: get_text(row, "host_name")?,
        host_club: get_opt_text(row, "host_club")?,
        host_contact: get_opt_text(row, "host_contact")?,
        age_group: AgeGroup::parse(&age_group_str)
            .ok_or_else(|| decode(format!("unknown age group `{age_group_str}`")))?,
        format: MatchFormat::parse(&format_str)
            .ok_or_else(|| decode(format!("unknown match format `{format_str}`")))?,
        duration_minutes: u32::try_from(duration)
            .map_err(|_| decode(format!("invalid duration `{duration}`")))?,
        location: get_text(row, "location")?,
        notes: get_opt_text(row, "notes")?,
        approver_email: get_text(row, "approver_email")?,
        status: OfferStatus::parse(&status_str)
            .ok_or_else(|| decode(format!("unknown offer status `{status_str}`")))?,
        share_token: get_text(row, "share_token")?,
        created_at: parse_ts(&get_text(row, "created_at")?, "created_at")?,
        updated_at: parse_ts(&get_text(row, "updated_at")?, "updated_at")?,
    })
}

fn row_to_slot(row: &SqliteRow) -> Result<Slot, StoreError> {
    let status_str = get_text(row, "status")?;

    let guest = match (
        get_opt_text(row, "guest_name")?,
        get_opt_text(row, "guest_club")?,
        get_opt_text(row, "guest_contact")?,
    ) {
        (None, None, None) => None,
        (Some(name), Some(club), Some(contact)) => Some(GuestDetails {
            name,
            club,
            contact,
            notes: get_opt_text(row, "guest_notes")?,
        }),
        _ => return Err(decode("partial guest details on slot row".to_string())),
    };

    let result = match parse_opt_ts(get_opt_text(row, "result_saved_at")?, "result_saved_at")? {
        None => None,
        Some(saved_at) => {
            let home: Option<i64> =
                row.try_get("home_score").map_err(|e| decode(e.to_string()))?;
            let away: Option<i64> =
                row.try_get("away_score").map_err(|e| decode(e.to_string()))?;
            let (Some(home), Some(away)) = (home, away) else {
                return Err(decode("result saved without both scores".to_string()));
            };
            Some(RecordedResult {
                home_score: u32::try_from(home)
                    .map_err(|_| decode(format!("invalid home score `{home}`")))?,
                away_score: u32::try_from(away)
                    .map_err(|_| decode(format!("invalid away score `{away}`")))?,
                notes: get_opt_text(row, "result_notes")?,
                saved_at,
            })
        }
    };

    Ok(Slot {
        id: SlotId(get_text(row, "id")?),
        offer_id: OfferId(get_text(row, "match_offer_id")?),
        start_time: parse_ts(&get_text(row, "start_time")?, "start_time")?,
        end_time: parse_ts(&get_text(row, "end_time")?, "end_time")?,
        status: SlotStatus::parse(&status_str)
            .ok_or_else(|| decode(format!("unknown slot status `{status_str}`")))?,
        held_by_session: get_opt_text(row, "held_by_session")?,
        held_at: parse_opt_ts(get_opt_text(row, "held_at")?, "held_at")?,
        guest,
        result,
        created_at: parse_ts(&get_text(row, "created_at")?, "created_at")?,
        updated_at: parse_ts(&get_text(row, "updated_at")?, "updated_at")?,
    })
}

#[async_trait]
impl BookingStore for SqlBookingStore {
    async fn insert_offer(
        &self,
        offer: NewOffer,
        slots: Vec<NewSlot>,
    ) -> Result<OfferWithSlots, StoreError> {
        let now = Utc::now();
        let now_str = fmt_ts(now);
        let offer_id = new_row_id();

        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO match_offers (id, host_name, host_club, host_contact, age_group, \
             format, duration_minutes, location, notes, approver_email, status, share_token, \
             created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&offer_id)
        .bind(&offer.host_name)
        .bind(&offer.host_club)
        .bind(&offer.host_contact)
        .bind(offer.age_group.as_str())
        .bind(offer.format.as_str())
        .bind(i64::from(offer.duration_minutes))
        .bind(&offer.location)
        .bind(&offer.notes)
        .bind(&offer.approver_email)
        .bind(offer.status.as_str())
        .bind(&offer.share_token)
        .bind(&now_str)
        .bind(&now_str)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let mut ordered = slots;
        ordered.sort_by_key(|slot| slot.start_time);

        let mut stored_slots = Vec::with_capacity(ordered.len());
        for slot in &ordered {
            let slot_id = new_row_id();
            sqlx::query(
                "INSERT INTO slots (id, match_offer_id, start_time, end_time, status, \
                 created_at, updated_at)
                 VALUES (?, ?, ?, ?, 'OPEN', ?, ?)",
            )
            .bind(&slot_id)
            .bind(&offer_id)
            .bind(fmt_ts(slot.start_time))
            .bind(fmt_ts(slot.end_time))
            .bind(&now_str)
            .bind(&now_str)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

            stored_slots.push(Slot {
                id: SlotId(slot_id),
                offer_id: OfferId(offer_id.clone()),
                start_time: slot.start_time,
                end_time: slot.end_time,
                status: SlotStatus::Open,
                held_by_session: None,
                held_at: None,
                guest: None,
                result: None,
                created_at: now,
                updated_at: now,
            });
        }

        tx.commit().await.map_err(backend)?;

        Ok(OfferWithSlots {
            offer: MatchOffer {
                id: OfferId(offer_id),
                host_name: offer.host_name,
                host_club: offer.host_club,
                host_contact: offer.host_contact,
                age_group: offer.age_group,
                format: offer.format,
                duration_minutes: offer.duration_minutes,
                location: offer.location,
                notes: offer.notes,
                approver_email: offer.approver_email,
                status: offer.status,
                share_token: offer.share_token,
                created_at: now,
                updated_at: now,
            },
            slots: stored_slots,
        })
    }

    async fn offer_by_id(&self, id: &OfferId) -> Result<Option<MatchOffer>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {OFFER_COLUMNS} FROM match_offers WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(row_to_offer).transpose()
    }

    async fn offer_by_share_token(&self, token: &str) -> Result<Option<MatchOffer>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {OFFER_COLUMNS} FROM match_offers WHERE share_token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(row_to_offer).transpose()
    }

    async fn offers_by_ids(&self, ids: &[OfferId]) -> Result<Vec<MatchOffer>, StoreError> {
        let mut offers = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(offer) = self.offer_by_id(id).await? {
                offers.push(offer);
            }
        }
        Ok(offers)
    }

    async fn slot_by_id(&self, id: &SlotId) -> Result<Option<Slot>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(row_to_slot).transpose()
    }

    async fn slots_for_offer(&self, offer_id: &OfferId) -> Result<Vec<Slot>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM slots WHERE match_offer_id = ? ORDER BY start_time ASC"
        ))
        .bind(&offer_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(row_to_slot).collect()
    }

    async fn update_offer_status(
        &self,
        id: &OfferId,
        expected: &[OfferStatus],
        to: OfferStatus,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE match_offers SET status = ?, updated_at = ? \
             WHERE id = ? AND status IN ({})",
            offer_status_list(expected)
        ))
        .bind(to.as_str())
        .bind(fmt_ts(at))
        .bind(&id.0)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn claim_slot(
        &self,
        id: &SlotId,
        session_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE slots SET status = 'HELD', held_by_session = ?, held_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'OPEN'",
        )
        .bind(session_id)
        .bind(fmt_ts(at))
        .bind(fmt_ts(at))
        .bind(&id.0)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn submit_booking(
        &self,
        id: &SlotId,
        expected: &[SlotStatus],
        session_id: &str,
        to: SlotStatus,
        guest: &GuestDetails,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE slots SET status = ?, held_by_session = ?, held_at = ?, guest_name = ?, \
             guest_club = ?, guest_contact = ?, guest_notes = ?, updated_at = ? \
             WHERE id = ? AND status IN ({}) \
               AND (status = 'OPEN' OR held_by_session = ?)",
            slot_status_list(expected)
        ))
        .bind(to.as_str())
        .bind(session_id)
        .bind(fmt_ts(at))
        .bind(&guest.name)
        .bind(&guest.club)
        .bind(&guest.contact)
        .bind(&guest.notes)
        .bind(fmt_ts(at))
        .bind(&id.0)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn release_slot(
        &self,
        id: &SlotId,
        expected: &[SlotStatus],
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE slots SET status = 'OPEN', held_by_session = NULL, held_at = NULL, \
             guest_name = NULL, guest_club = NULL, guest_contact = NULL, guest_notes = NULL, \
             updated_at = ? \
             WHERE id = ? AND status IN ({})",
            slot_status_list(expected)
        ))
        .bind(fmt_ts(at))
        .bind(&id.0)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn commit_booking(
        &self,
        offer_id: &OfferId,
        winner: &SlotId,
        expected: &[SlotStatus],
        guest: Option<&GuestDetails>,
        notifications: &[NewNotification],
        at: DateTime<Utc>,
    ) -> Result<Option<BookingCascade>, StoreError> {
        let at_str = fmt_ts(at);
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let booked = sqlx::query(&format!(
            "UPDATE slots SET status = 'BOOKED', \
             guest_name = COALESCE(?, guest_name), guest_club = COALESCE(?, guest_club), \
             guest_contact = COALESCE(?, guest_contact), guest_notes = COALESCE(?, guest_notes), \
             updated_at = ? \
             WHERE id = ? AND match_offer_id = ? AND status IN ({})",
            slot_status_list(expected)
        ))
        .bind(guest.map(|g| g.name.as_str()))
        .bind(guest.map(|g| g.club.as_str()))
        .bind(guest.map(|g| g.contact.as_str()))
        .bind(guest.and_then(|g| g.notes.as_deref()))
        .bind(&at_str)
        .bind(&winner.0)
        .bind(&offer_id.0)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        if booked.rows_affected() == 0 {
            tx.rollback().await.map_err(backend)?;
            return Ok(None);
        }

        let rejected = sqlx::query(
            "UPDATE slots SET status = 'REJECTED', updated_at = ? \
             WHERE match_offer_id = ? AND id != ? \
               AND status IN ('OPEN', 'HELD', 'PENDING_APPROVAL')",
        )
        .bind(&at_str)
        .bind(&offer_id.0)
        .bind(&winner.0)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        sqlx::query(
            "UPDATE match_offers SET status = 'CLOSED', updated_at = ? \
             WHERE id = ? AND status = 'OPEN'",
        )
        .bind(&at_str)
        .bind(&offer_id.0)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        for notification in notifications {
            sqlx::query(
                "INSERT INTO notifications (id, recipient_email, recipient_type, \
                 notification_type, match_offer_id, slot_id, subject, body, sent, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
            )
            .bind(new_row_id())
            .bind(&notification.recipient_email)
            .bind(notification.recipient_role.as_str())
            .bind(notification.kind.as_str())
            .bind(&notification.offer_id.0)
            .bind(notification.slot_id.as_ref().map(|id| id.0.as_str()))
            .bind(&notification.subject)
            .bind(&notification.body)
            .bind(&at_str)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;

        let slot = self
            .slot_by_id(winner)
            .await?
            .ok_or_else(|| StoreError::Backend("booked slot vanished".to_string()))?;
        let offer = self
            .offer_by_id(offer_id)
            .await?
            .ok_or_else(|| StoreError::Backend("booked offer vanished".to_string()))?;

        Ok(Some(BookingCascade { slot, offer, rejected_siblings: rejected.rows_affected() }))
    }

    async fn reject_claimable_slots(
        &self,
        offer_id: &OfferId,
        except: Option<&SlotId>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = match except {
            Some(except) => {
                sqlx::query(
                    "UPDATE slots SET status = 'REJECTED', updated_at = ? \
                     WHERE match_offer_id = ? AND id != ? \
                       AND status IN ('OPEN', 'HELD', 'PENDING_APPROVAL')",
                )
                .bind(fmt_ts(at))
                .bind(&offer_id.0)
                .bind(&except.0)
                .execute(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "UPDATE slots SET status = 'REJECTED', updated_at = ? \
                     WHERE match_offer_id = ? \
                       AND status IN ('OPEN', 'HELD', 'PENDING_APPROVAL')",
                )
                .bind(fmt_ts(at))
                .bind(&offer_id.0)
                .execute(&self.pool)
                .await
            }
        }
        .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn release_stale_holds(
        &self,
        held_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Vec<SlotId>, StoreError> {
        let cutoff = fmt_ts(held_before);
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let rows = sqlx::query(
            "SELECT id FROM slots WHERE status = 'HELD' AND held_at < ? ORDER BY held_at ASC",
        )
        .bind(&cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;

        let released: Vec<SlotId> = rows
            .iter()
            .map(|row| row.try_get::<String, _>("id").map(SlotId))
            .collect::<Result<_, _>>()
            .map_err(|e| decode(e.to_string()))?;

        sqlx::query(
            "UPDATE slots SET status = 'OPEN', held_by_session = NULL, held_at = NULL, \
             guest_name = NULL, guest_club = NULL, guest_contact = NULL, guest_notes = NULL, \
             updated_at = ? \
             WHERE status = 'HELD' AND held_at < ?",
        )
        .bind(fmt_ts(at))
        .bind(&cutoff)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(released)
    }

    async fn record_result(
        &self,
        id: &SlotId,
        result: &MatchResult,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let outcome = sqlx::query(
            "UPDATE slots SET home_score = ?, away_score = ?, result_notes = ?, \
             result_saved_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'BOOKED'",
        )
        .bind(i64::from(result.home_score))
        .bind(i64::from(result.away_score))
        .bind(notes)
        .bind(fmt_ts(at))
        .bind(fmt_ts(at))
        .bind(&id.0)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(outcome.rows_affected())
    }

    async fn delete_offer(&self, id: &OfferId) -> Result<u64, StoreError> {
        // Slots go with the offer via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM match_offers WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected())
    }
}
