//! In-memory gateway used by coordinator unit tests and demos. A single
//! mutex over the whole state makes every conditional update and the booking
//! cascade naturally atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::approval::{Approval, ApprovalId, ApprovalStatus};
use crate::domain::notification::{NewNotification, Notification, NotificationId};
use crate::domain::offer::{MatchOffer, OfferId, OfferStatus, OfferWithSlots};
use crate::domain::slot::{GuestDetails, MatchResult, RecordedResult, Slot, SlotId, SlotStatus};

use super::{
    ApprovalStore, BookingCascade, BookingStore, NewApproval, NewOffer, NewSlot,
    NotificationOutbox, StoreError,
};

#[derive(Debug, Default)]
struct State {
    offers: HashMap<String, MatchOffer>,
    slots: HashMap<String, Slot>,
    approvals: HashMap<String, Approval>,
    notifications: Vec<Notification>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn clear_guest_fields(slot: &mut Slot, at: DateTime<Utc>) {
    slot.held_by_session = None;
    slot.held_at = None;
    slot.guest = None;
    slot.updated_at = at;
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_offer(
        &self,
        offer: NewOffer,
        slots: Vec<NewSlot>,
    ) -> Result<OfferWithSlots, StoreError> {
        let now = Utc::now();
        let stored = MatchOffer {
            id: OfferId(new_id()),
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
        };

        let mut stored_slots: Vec<Slot> = slots
            .into_iter()
            .map(|slot| Slot {
                id: SlotId(new_id()),
                offer_id: stored.id.clone(),
                start_time: slot.start_time,
                end_time: slot.end_time,
                status: SlotStatus::Open,
                held_by_session: None,
                held_at: None,
                guest: None,
                result: None,
                created_at: now,
                updated_at: now,
            })
            .collect();
        stored_slots.sort_by_key(|slot| slot.start_time);

        let mut state = self.lock();
        state.offers.insert(stored.id.0.clone(), stored.clone());
        for slot in &stored_slots {
            state.slots.insert(slot.id.0.clone(), slot.clone());
        }

        Ok(OfferWithSlots { offer: stored, slots: stored_slots })
    }

    async fn offer_by_id(&self, id: &OfferId) -> Result<Option<MatchOffer>, StoreError> {
        Ok(self.lock().offers.get(&id.0).cloned())
    }

    async fn offer_by_share_token(&self, token: &str) -> Result<Option<MatchOffer>, StoreError> {
        Ok(self.lock().offers.values().find(|offer| offer.share_token == token).cloned())
    }

    async fn offers_by_ids(&self, ids: &[OfferId]) -> Result<Vec<MatchOffer>, StoreError> {
        let state = self.lock();
        Ok(ids.iter().filter_map(|id| state.offers.get(&id.0).cloned()).collect())
    }

    async fn slot_by_id(&self, id: &SlotId) -> Result<Option<Slot>, StoreError> {
        Ok(self.lock().slots.get(&id.0).cloned())
    }

    async fn slots_for_offer(&self, offer_id: &OfferId) -> Result<Vec<Slot>, StoreError> {
        let state = self.lock();
        let mut slots: Vec<Slot> =
            state.slots.values().filter(|slot| slot.offer_id == *offer_id).cloned().collect();
        slots.sort_by_key(|slot| slot.start_time);
        Ok(slots)
    }

    async fn update_offer_status(
        &self,
        id: &OfferId,
        expected: &[OfferStatus],
        to: OfferStatus,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.lock();
        match state.offers.get_mut(&id.0) {
            Some(offer) if expected.contains(&offer.status) => {
                offer.status = to;
                offer.updated_at = at;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn claim_slot(
        &self,
        id: &SlotId,
        session_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.lock();
        match state.slots.get_mut(&id.0) {
            Some(slot) if slot.status == SlotStatus::Open => {
                slot.status = SlotStatus::Held;
                slot.held_by_session = Some(session_id.to_string());
                slot.held_at = Some(at);
                slot.updated_at = at;
                Ok(1)
            }
            _ => Ok(0),
        }
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
        let mut state = self.lock();
        let Some(slot) = state.slots.get_mut(&id.0) else {
            return Ok(0);
        };

        let own_hold = slot.status == SlotStatus::Open
            || slot.held_by_session.as_deref() == Some(session_id);
        if !expected.contains(&slot.status) || !own_hold {
            return Ok(0);
        }

        slot.status = to;
        slot.held_by_session = Some(session_id.to_string());
        slot.held_at = Some(at);
        slot.guest = Some(guest.clone());
        slot.updated_at = at;
        Ok(1)
    }

    async fn release_slot(
        &self,
        id: &SlotId,
        expected: &[SlotStatus],
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.lock();
        match state.slots.get_mut(&id.0) {
            Some(slot) if expected.contains(&slot.status) => {
                slot.status = SlotStatus::Open;
                clear_guest_fields(slot, at);
                Ok(1)
            }
            _ => Ok(0),
        }
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
        let mut state = self.lock();

        let Some(current) = state.slots.get(&winner.0) else {
            return Ok(None);
        };
        if current.offer_id != *offer_id || !expected.contains(&current.status) {
            return Ok(None);
        }
        if !state.offers.contains_key(&offer_id.0) {
            return Err(StoreError::Backend(format!("offer {} missing for booking", offer_id.0)));
        }

        let mut rejected_siblings = 0;
        for slot in state.slots.values_mut() {
            if slot.offer_id == *offer_id && slot.id != *winner && slot.status.is_claimable() {
                slot.status = SlotStatus::Rejected;
                slot.updated_at = at;
                rejected_siblings += 1;
            }
        }

        let booked = {
            let slot = state
                .slots
                .get_mut(&winner.0)
                .ok_or_else(|| StoreError::Backend("winner slot vanished".to_string()))?;
            slot.status = SlotStatus::Booked;
            if let Some(guest) = guest {
                slot.guest = Some(guest.clone());
            }
            slot.updated_at = at;
            slot.clone()
        };

        let offer = {
            let offer = state
                .offers
                .get_mut(&offer_id.0)
                .ok_or_else(|| StoreError::Backend("offer vanished".to_string()))?;
            if offer.status == OfferStatus::Open {
                offer.status = OfferStatus::Closed;
            }
            offer.updated_at = at;
            offer.clone()
        };

        for notification in notifications {
            let row = Notification {
                id: NotificationId(new_id()),
                recipient_email: notification.recipient_email.clone(),
                recipient_role: notification.recipient_role,
                kind: notification.kind,
                offer_id: notification.offer_id.clone(),
                slot_id: notification.slot_id.clone(),
                subject: notification.subject.clone(),
                body: notification.body.clone(),
                sent: false,
                sent_at: None,
                created_at: at,
            };
            state.notifications.push(row);
        }

        Ok(Some(BookingCascade { slot: booked, offer, rejected_siblings }))
    }

    async fn reject_claimable_slots(
        &self,
        offer_id: &OfferId,
        except: Option<&SlotId>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.lock();
        let mut rejected = 0;
        for slot in state.slots.values_mut() {
            if slot.offer_id == *offer_id
                && except != Some(&slot.id)
                && slot.status.is_claimable()
            {
                slot.status = SlotStatus::Rejected;
                slot.updated_at = at;
                rejected += 1;
            }
        }
        Ok(rejected)
    }

    async fn release_stale_holds(
        &self,
        held_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Vec<SlotId>, StoreError> {
        let mut state = self.lock();
        let mut released = Vec::new();
        for slot in state.slots.values_mut() {
            let stale = slot.status == SlotStatus::Held
                && slot.held_at.map_or(false, |held_at| held_at < held_before);
            if stale {
                slot.status = SlotStatus::Open;
                clear_guest_fields(slot, at);
                released.push(slot.id.clone());
            }
        }
        Ok(released)
    }

    async fn record_result(
        &self,
        id: &SlotId,
        result: &MatchResult,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.lock();
        match state.slots.get_mut(&id.0) {
            Some(slot) if slot.status == SlotStatus::Booked => {
                slot.result = Some(RecordedResult {
                    home_score: result.home_score,
                    away_score: result.away_score,
                    notes: notes.map(str::to_string),
                    saved_at: at,
                });
                slot.updated_at = at;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete_offer(&self, id: &OfferId) -> Result<u64, StoreError> {
        let mut state = self.lock();
        if state.offers.remove(&id.0).is_none() {
            return Ok(0);
        }
        state.slots.retain(|_, slot| slot.offer_id != *id);
        Ok(1)
    }
}

#[async_trait]
impl ApprovalStore for InMemoryStore {
    async fn insert_approval(&self, approval: NewApproval) -> Result<Approval, StoreError> {
        let stored = Approval {
            id: ApprovalId(new_id()),
            offer_id: approval.offer_id,
            slot_id: approval.slot_id,
            approval_token: approval.approval_token,
            approver_email: approval.approver_email,
            status: ApprovalStatus::Pending,
            decision_at: None,
            decision_notes: None,
            created_at: Utc::now(),
        };

        let mut state = self.lock();
        if state
            .approvals
            .values()
            .any(|existing| existing.approval_token == stored.approval_token)
        {
            return Err(StoreError::Backend(
                "approval token already exists".to_string(),
            ));
        }
        state.approvals.insert(stored.id.0.clone(), stored.clone());
        Ok(stored)
    }

    async fn approval_by_token(&self, token: &str) -> Result<Option<Approval>, StoreError> {
        Ok(self
            .lock()
            .approvals
            .values()
            .find(|approval| approval.approval_token == token)
            .cloned())
    }

    async fn pending_offer_approval(
        &self,
        offer_id: &OfferId,
    ) -> Result<Option<Approval>, StoreError> {
        Ok(self
            .lock()
            .approvals
            .values()
            .find(|approval| {
                approval.offer_id == *offer_id
                    && approval.slot_id.is_none()
                    && approval.status == ApprovalStatus::Pending
            })
            .cloned())
    }

    async fn pending_slot_approvals(
        &self,
        offer_id: &OfferId,
    ) -> Result<Vec<Approval>, StoreError> {
        let state = self.lock();
        let mut pending: Vec<Approval> = state
            .approvals
            .values()
            .filter(|approval| {
                approval.offer_id == *offer_id
                    && approval.slot_id.is_some()
                    && approval.status == ApprovalStatus::Pending
            })
            .cloned()
            .collect();
        pending.sort_by_key(|approval| approval.created_at);
        Ok(pending)
    }

    async fn resolve_approval(
        &self,
        token: &str,
        decision: ApprovalStatus,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut state = self.lock();
        let Some(approval) = state
            .approvals
            .values_mut()
            .find(|approval| approval.approval_token == token)
        else {
            return Ok(0);
        };

        if approval.status != ApprovalStatus::Pending {
            return Ok(0);
        }

        approval.status = decision;
        approval.decision_at = Some(at);
        approval.decision_notes = notes.map(str::to_string);
        Ok(1)
    }
}

#[async_trait]
impl NotificationOutbox for InMemoryStore {
    async fn enqueue(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        let stored = Notification {
            id: NotificationId(new_id()),
            recipient_email: notification.recipient_email,
            recipient_role: notification.recipient_role,
            kind: notification.kind,
            offer_id: notification.offer_id,
            slot_id: notification.slot_id,
            subject: notification.subject,
            body: notification.body,
            sent: false,
            sent_at: None,
            created_at: Utc::now(),
        };

        self.lock().notifications.push(stored.clone());
        Ok(stored)
    }

    async fn unsent(&self, limit: u32) -> Result<Vec<Notification>, StoreError> {
        let state = self.lock();
        Ok(state
            .notifications
            .iter()
            .filter(|notification| !notification.sent)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_sent(&self, id: &NotificationId, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.lock();
        let Some(notification) = state
            .notifications
            .iter_mut()
            .find(|notification| notification.id == *id && !notification.sent)
        else {
            return Ok(0);
        };

        notification.sent = true;
        notification.sent_at = Some(at);
        Ok(1)
    }

    async fn for_offer(&self, offer_id: &OfferId) -> Result<Vec<Notification>, StoreError> {
        let state = self.lock();
        Ok(state
            .notifications
            .iter()
            .filter(|notification| notification.offer_id == *offer_id)
            .cloned()
            .collect())
    }
}
