//! Persistence gateway consumed by the coordinator.
//!
//! The traits here are the only way workflow code touches durable state.
//! Implementations are injected at construction, which keeps the core free
//! of a process-wide store handle and lets tests run on [`InMemoryStore`].
//! Conditional updates report affected-row counts so callers can detect
//! lost races instead of overwriting a concurrent winner.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::approval::{Approval, ApprovalStatus};
use crate::domain::notification::{NewNotification, Notification, NotificationId};
use crate::domain::offer::{AgeGroup, MatchFormat, MatchOffer, OfferId, OfferStatus, OfferWithSlots};
use crate::domain::slot::{GuestDetails, MatchResult, Slot, SlotId, SlotStatus};

pub use memory::InMemoryStore;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("stored row rejected: {0}")]
    Decode(String),
}

/// Insert payload for an offer; id and timestamps are store-generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOffer {
    pub host_name: String,
    pub host_club: Option<String>,
    pub host_contact: Option<String>,
    pub age_group: AgeGroup,
    pub format: MatchFormat,
    pub duration_minutes: u32,
    pub location: String,
    pub notes: Option<String>,
    pub approver_email: String,
    pub status: OfferStatus,
    pub share_token: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Result of a committed booking cascade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingCascade {
    pub slot: Slot,
    pub offer: MatchOffer,
    pub rejected_siblings: u64,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_offer(
        &self,
        offer: NewOffer,
        slots: Vec<NewSlot>,
    ) -> Result<OfferWithSlots, StoreError>;

    async fn offer_by_id(&self, id: &OfferId) -> Result<Option<MatchOffer>, StoreError>;

    async fn offer_by_share_token(&self, token: &str) -> Result<Option<MatchOffer>, StoreError>;

    async fn offers_by_ids(&self, ids: &[OfferId]) -> Result<Vec<MatchOffer>, StoreError>;

    async fn slot_by_id(&self, id: &SlotId) -> Result<Option<Slot>, StoreError>;

    /// Slots of an offer, ordered by start time.
    async fn slots_for_offer(&self, offer_id: &OfferId) -> Result<Vec<Slot>, StoreError>;

    /// Conditional status flip. Returns the affected-row count; zero means
    /// the offer was not in any of the expected states.
    async fn update_offer_status(
        &self,
        id: &OfferId,
        expected: &[OfferStatus],
        to: OfferStatus,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Compare-and-swap claim: OPEN -> HELD with hold metadata. Zero rows
    /// means another guest won the slot.
    async fn claim_slot(
        &self,
        id: &SlotId,
        session_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Attaches guest details and moves the slot to `to` (PENDING_APPROVAL
    /// under the approval-gated policy). Succeeds from OPEN, or from a
    /// non-terminal hold owned by `session_id`.
    async fn submit_booking(
        &self,
        id: &SlotId,
        expected: &[SlotStatus],
        session_id: &str,
        to: SlotStatus,
        guest: &GuestDetails,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Reopens a slot, clearing hold metadata and guest details.
    async fn release_slot(
        &self,
        id: &SlotId,
        expected: &[SlotStatus],
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// The atomic booking cascade: winner -> BOOKED (attaching `guest` when
    /// given), every claimable sibling -> REJECTED, offer -> CLOSED, and the
    /// given notifications enqueued, as one transactional commit. Returns
    /// `None` when the winner was no longer in an expected state; in that
    /// case nothing was written.
    async fn commit_booking(
        &self,
        offer_id: &OfferId,
        winner: &SlotId,
        expected: &[SlotStatus],
        guest: Option<&GuestDetails>,
        notifications: &[NewNotification],
        at: DateTime<Utc>,
    ) -> Result<Option<BookingCascade>, StoreError>;

    /// Single conditional bulk update rejecting every claimable slot of the
    /// offer, optionally sparing one.
    async fn reject_claimable_slots(
        &self,
        offer_id: &OfferId,
        except: Option<&SlotId>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Expiry sweep: reopens slots held since before `held_before`.
    async fn release_stale_holds(
        &self,
        held_before: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Vec<SlotId>, StoreError>;

    /// Records a final score on a BOOKED slot.
    async fn record_result(
        &self,
        id: &SlotId,
        result: &MatchResult,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Hard delete with slot cascade. Approvals and notifications survive as
    /// append-only logs.
    async fn delete_offer(&self, id: &OfferId) -> Result<u64, StoreError>;
}

/// Insert payload for an approval; id and created_at are store-generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewApproval {
    pub offer_id: OfferId,
    pub slot_id: Option<SlotId>,
    pub approval_token: String,
    pub approver_email: String,
}

#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn insert_approval(&self, approval: NewApproval) -> Result<Approval, StoreError>;

    async fn approval_by_token(&self, token: &str) -> Result<Option<Approval>, StoreError>;

    /// The pending offer-level approval for an offer, if any. Backs the
    /// no-duplicate-pending-approvals guarantee.
    async fn pending_offer_approval(
        &self,
        offer_id: &OfferId,
    ) -> Result<Option<Approval>, StoreError>;

    /// Pending slot-level approvals for an offer, oldest first.
    async fn pending_slot_approvals(&self, offer_id: &OfferId)
        -> Result<Vec<Approval>, StoreError>;

    /// Single-use resolution guarded on PENDING. Zero rows means another
    /// decider already resolved the token.
    async fn resolve_approval(
        &self,
        token: &str,
        decision: ApprovalStatus,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait NotificationOutbox: Send + Sync {
    /// Fire-and-forget from the coordinator's perspective; delivery is the
    /// dispatcher collaborator's concern.
    async fn enqueue(&self, notification: NewNotification) -> Result<Notification, StoreError>;

    async fn unsent(&self, limit: u32) -> Result<Vec<Notification>, StoreError>;

    async fn mark_sent(&self, id: &NotificationId, at: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn for_offer(&self, offer_id: &OfferId) -> Result<Vec<Notification>, StoreError>;
}
