//! The approval workflow coordinator: bridges token-bearing human decisions
//! into booking state machine transitions.
//!
//! The coordinator holds no mutable state of its own. Every operation
//! re-reads current rows through the injected gateway before deciding a
//! transition, and the races that matter (two guests claiming one slot, two
//! deciders resolving one token) are settled by conditional writes at the
//! persistence boundary, never by in-process locking.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::domain::approval::{Approval, ApprovalStatus, Decision};
use crate::domain::offer::{
    AgeGroup, MatchFormat, MatchOffer, OfferId, OfferStatus, OfferWithSlots,
    MATCH_DURATIONS_MINUTES,
};
use crate::domain::slot::{
    validate_window, GuestDetails, MatchResult, Slot, SlotId, SlotStatus,
};
use crate::errors::{DomainError, ValidationError, WorkflowError};
use crate::flows::{BookingFlow, FlowTransitionError, OfferEvent, SlotEvent, WorkflowPolicy};
use crate::links::LinkBuilder;
use crate::notify;
use crate::store::{
    ApprovalStore, BookingCascade, BookingStore, NewApproval, NewOffer, NewSlot,
    NotificationOutbox, StoreError,
};
use crate::token::{TokenIssuer, MAX_ISSUE_ATTEMPTS};

/// Host input for a new offer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferDraft {
    pub host_name: String,
    pub host_club: Option<String>,
    pub host_contact: Option<String>,
    pub age_group: AgeGroup,
    pub format: MatchFormat,
    pub duration_minutes: u32,
    pub location: String,
    pub notes: Option<String>,
    pub approver_email: String,
    pub slots: Vec<SlotDraft>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotDraft {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedOffer {
    pub offer: MatchOffer,
    pub slots: Vec<Slot>,
    pub share_link: String,
    /// Present when the workflow requires offer-level sign-off.
    pub approval_link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestedApproval {
    pub approval: Approval,
    pub approval_link: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferDecision {
    pub approval: Approval,
    pub offer: MatchOffer,
}

/// What a guest's booking request turned into under the active policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BookingOutcome {
    PendingApproval { slot: Slot, approval: Approval },
    Booked(BookingCascade),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotDecision {
    pub approval: Approval,
    /// The committed cascade on approval; `None` for rejections.
    pub cascade: Option<BookingCascade>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecisionOutcome {
    Offer(OfferDecision),
    Slot(SlotDecision),
}

/// Per-item report of a bulk decision; partial failure is surfaced, never
/// silently rolled back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkItem {
    pub approval: Approval,
    pub outcome: Result<ApprovalStatus, WorkflowError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkDecision {
    pub items: Vec<BulkItem>,
    pub offer_status: OfferStatus,
}

/// Read-only view behind an approval link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalView {
    pub approval: Approval,
    pub offer: MatchOffer,
    pub slots: Vec<Slot>,
}

pub struct WorkflowCoordinator {
    store: Arc<dyn BookingStore>,
    approvals: Arc<dyn ApprovalStore>,
    outbox: Arc<dyn NotificationOutbox>,
    tokens: Arc<dyn TokenIssuer>,
    links: LinkBuilder,
    flow: BookingFlow,
}

impl WorkflowCoordinator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        approvals: Arc<dyn ApprovalStore>,
        outbox: Arc<dyn NotificationOutbox>,
        tokens: Arc<dyn TokenIssuer>,
        links: LinkBuilder,
        policy: WorkflowPolicy,
    ) -> Self {
        Self { store, approvals, outbox, tokens, links, flow: BookingFlow::new(policy) }
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        self.flow.policy()
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Validates the draft, issues a share token, and persists the offer
    /// with all its slots OPEN. Under offer-first approval the offer starts
    /// PENDING_APPROVAL and the approval request goes out immediately.
    pub async fn create_offer(&self, draft: OfferDraft) -> Result<CreatedOffer, WorkflowError> {
        validate_draft(&draft)?;

        let share_token = self.issue_share_token().await?;
        let status = self.flow.initial_offer_status();

        let created = self
            .store
            .insert_offer(
                NewOffer {
                    host_name: draft.host_name,
                    host_club: draft.host_club,
                    host_contact: draft.host_contact,
                    age_group: draft.age_group,
                    format: draft.format,
                    duration_minutes: draft.duration_minutes,
                    location: draft.location,
                    notes: draft.notes,
                    approver_email: draft.approver_email,
                    status,
                    share_token,
                },
                draft
                    .slots
                    .iter()
                    .map(|slot| NewSlot { start_time: slot.start_time, end_time: slot.end_time })
                    .collect(),
            )
            .await?;

        info!(
            event_name = "booking.offer_created",
            offer_id = %created.offer.id.0,
            status = created.offer.status.as_str(),
            slots = created.slots.len(),
            "match offer created"
        );

        let approval_link = if status == OfferStatus::PendingApproval {
            let requested = self.request_approval_for(&created.offer, &created.slots).await?;
            Some(requested.approval_link)
        } else {
            None
        };

        let share_link = self.links.share_link(&created.offer.share_token);
        Ok(CreatedOffer { offer: created.offer, slots: created.slots, share_link, approval_link })
    }

    /// Idempotent per offer: an existing pending offer-level approval is
    /// returned instead of creating a duplicate.
    pub async fn request_offer_approval(
        &self,
        offer_id: &OfferId,
    ) -> Result<RequestedApproval, WorkflowError> {
        let offer = self
            .store
            .offer_by_id(offer_id)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?;
        if offer.status != OfferStatus::PendingApproval {
            return Err(FlowTransitionError::InvalidOfferEvent {
                status: offer.status,
                event: OfferEvent::ApprovalGranted,
            }
            .into());
        }
        let slots = self.store.slots_for_offer(offer_id).await?;
        self.request_approval_for(&offer, &slots).await
    }

    async fn request_approval_for(
        &self,
        offer: &MatchOffer,
        slots: &[Slot],
    ) -> Result<RequestedApproval, WorkflowError> {
        if let Some(existing) = self.approvals.pending_offer_approval(&offer.id).await? {
            let approval_link = self.links.approval_link(&existing.approval_token);
            return Ok(RequestedApproval { approval: existing, approval_link });
        }

        let token = self.issue_approval_token().await?;
        let approval = self
            .approvals
            .insert_approval(NewApproval {
                offer_id: offer.id.clone(),
                slot_id: None,
                approval_token: token,
                approver_email: offer.approver_email.clone(),
            })
            .await?;

        let approval_link = self.links.approval_link(&approval.approval_token);
        self.outbox
            .enqueue(notify::offer_approval_request(offer, slots, &approval_link))
            .await?;

        info!(
            event_name = "booking.offer_approval_requested",
            offer_id = %offer.id.0,
            approval_id = %approval.id.0,
            "offer approval requested"
        );

        Ok(RequestedApproval { approval, approval_link })
    }

    /// Routes a decision by token, whichever stage the token belongs to.
    pub async fn decide_approval(
        &self,
        token: &str,
        decision: Decision,
        notes: Option<&str>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let approval = self
            .approvals
            .approval_by_token(token)
            .await?
            .ok_or(WorkflowError::not_found("approval"))?;

        if approval.is_offer_level() {
            self.decide_offer_approval(token, decision, notes).await.map(DecisionOutcome::Offer)
        } else {
            self.decide_slot_approval(token, decision, notes).await.map(DecisionOutcome::Slot)
        }
    }

    pub async fn decide_offer_approval(
        &self,
        token: &str,
        decision: Decision,
        notes: Option<&str>,
    ) -> Result<OfferDecision, WorkflowError> {
        let approval = self
            .approvals
            .approval_by_token(token)
            .await?
            .ok_or(WorkflowError::not_found("approval"))?;
        if !approval.is_offer_level() {
            return Err(WorkflowError::not_found("offer approval"));
        }
        if approval.is_resolved() {
            return Err(already_processed(&approval));
        }

        let notes = normalized_notes(notes);
        if decision == Decision::Reject && notes.is_none() {
            return Err(ValidationError::MissingDecisionNotes.into());
        }

        let now = Utc::now();
        let resolved = self
            .approvals
            .resolve_approval(token, decision.resolved_status(), notes.as_deref(), now)
            .await?;
        if resolved == 0 {
            return Err(self.reread_resolved(token).await?);
        }

        let offer = self
            .store
            .offer_by_id(&approval.offer_id)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?;

        let event = match decision {
            Decision::Approve => OfferEvent::ApprovalGranted,
            Decision::Reject => OfferEvent::ApprovalDenied,
        };
        let transition = self.flow.offer_transition(offer.status, event)?;

        let affected = self
            .store
            .update_offer_status(&offer.id, &[OfferStatus::PendingApproval], transition.to, now)
            .await?;
        if affected == 0 {
            let fresh = self
                .store
                .offer_by_id(&offer.id)
                .await?
                .ok_or(WorkflowError::not_found("offer"))?;
            if fresh.status != transition.to {
                return Err(DomainError::InvalidOfferTransition {
                    from: fresh.status,
                    to: transition.to,
                }
                .into());
            }
        }

        if let Some(host_contact) = offer.host_contact.as_deref() {
            let message = match decision {
                Decision::Approve => notify::offer_opened(
                    &offer,
                    host_contact,
                    &self.links.share_link(&offer.share_token),
                ),
                Decision::Reject => notify::offer_rejected(
                    &offer,
                    host_contact,
                    notes.as_deref().unwrap_or_default(),
                ),
            };
            self.outbox.enqueue(message).await?;
        }

        info!(
            event_name = "booking.offer_decided",
            offer_id = %offer.id.0,
            decision = decision.resolved_status().as_str(),
            "offer approval decided"
        );

        let mut updated = offer;
        updated.status = transition.to;
        updated.updated_at = now;

        Ok(OfferDecision {
            approval: resolved_copy(approval, decision, notes, now),
            offer: updated,
        })
    }

    /// Compare-and-swap claim of an OPEN slot. On conflict the caller must
    /// re-fetch and present alternatives, never retry blindly.
    pub async fn claim_slot(
        &self,
        slot_id: &SlotId,
        session_id: &str,
    ) -> Result<Slot, WorkflowError> {
        let slot = self
            .store
            .slot_by_id(slot_id)
            .await?
            .ok_or(WorkflowError::not_found("slot"))?;
        let offer = self
            .store
            .offer_by_id(&slot.offer_id)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?;

        if offer.status != OfferStatus::Open || slot.status != SlotStatus::Open {
            return Err(WorkflowError::SlotUnavailable);
        }

        let now = Utc::now();
        let affected = self.store.claim_slot(slot_id, session_id, now).await?;
        if affected == 0 {
            return Err(WorkflowError::SlotUnavailable);
        }

        info!(
            event_name = "booking.slot_claimed",
            offer_id = %offer.id.0,
            slot_id = %slot_id.0,
            "slot claimed"
        );

        self.store
            .slot_by_id(slot_id)
            .await?
            .ok_or(WorkflowError::not_found("slot"))
    }

    /// A guest submits team details for a slot. Under `require_slot_approval`
    /// the slot moves to PENDING_APPROVAL and the approver is asked to
    /// decide; otherwise the booking cascade commits directly.
    pub async fn request_slot_booking(
        &self,
        slot_id: &SlotId,
        guest: GuestDetails,
        session_id: &str,
    ) -> Result<BookingOutcome, WorkflowError> {
        guest.validate()?;

        let slot = self
            .store
            .slot_by_id(slot_id)
            .await?
            .ok_or(WorkflowError::not_found("slot"))?;
        let offer = self
            .store
            .offer_by_id(&slot.offer_id)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?;

        if offer.status != OfferStatus::Open {
            return Err(WorkflowError::SlotUnavailable);
        }

        let expected: &[SlotStatus] = match slot.status {
            SlotStatus::Open => &[SlotStatus::Open],
            SlotStatus::Held
                if slot.held_by_session.as_deref() == Some(session_id) =>
            {
                &[SlotStatus::Open, SlotStatus::Held]
            }
            _ => return Err(WorkflowError::SlotUnavailable),
        };

        let transition = self
            .flow
            .slot_transition(slot.status, SlotEvent::BookingRequested)
            .map_err(|_| WorkflowError::SlotUnavailable)?;
        let now = Utc::now();

        if transition.to == SlotStatus::Booked {
            let mut notifications = Vec::new();
            if let Some(host_contact) = offer.host_contact.as_deref() {
                notifications
                    .push(notify::booking_confirmed_host(&offer, &slot, &guest, host_contact));
            }
            notifications.push(notify::booking_confirmed_guest(&offer, &slot, &guest));

            let cascade = self
                .store
                .commit_booking(&offer.id, slot_id, expected, Some(&guest), &notifications, now)
                .await?
                .ok_or(WorkflowError::SlotUnavailable)?;

            info!(
                event_name = "booking.slot_booked",
                offer_id = %offer.id.0,
                slot_id = %slot_id.0,
                rejected_siblings = cascade.rejected_siblings,
                "slot booked directly"
            );

            return Ok(BookingOutcome::Booked(cascade));
        }

        let affected = self
            .store
            .submit_booking(slot_id, expected, session_id, transition.to, &guest, now)
            .await?;
        if affected == 0 {
            return Err(WorkflowError::SlotUnavailable);
        }

        let token = self.issue_approval_token().await?;
        let approval = self
            .approvals
            .insert_approval(NewApproval {
                offer_id: offer.id.clone(),
                slot_id: Some(slot_id.clone()),
                approval_token: token,
                approver_email: offer.approver_email.clone(),
            })
            .await?;

        let updated = self
            .store
            .slot_by_id(slot_id)
            .await?
            .ok_or(WorkflowError::not_found("slot"))?;

        let approval_link = self.links.approval_link(&approval.approval_token);
        self.outbox
            .enqueue(notify::slot_approval_request(&offer, &updated, &guest, &approval_link))
            .await?;
        if let Some(host_contact) = offer.host_contact.as_deref() {
            self.outbox
                .enqueue(notify::slot_selected(&offer, &updated, &guest, host_contact))
                .await?;
        }

        info!(
            event_name = "booking.slot_booking_requested",
            offer_id = %offer.id.0,
            slot_id = %slot_id.0,
            approval_id = %approval.id.0,
            "slot booking awaiting approval"
        );

        Ok(BookingOutcome::PendingApproval { slot: updated, approval })
    }

    pub async fn decide_slot_approval(
        &self,
        token: &str,
        decision: Decision,
        notes: Option<&str>,
    ) -> Result<SlotDecision, WorkflowError> {
        let approval = self
            .approvals
            .approval_by_token(token)
            .await?
            .ok_or(WorkflowError::not_found("approval"))?;
        let Some(slot_id) = approval.slot_id.clone() else {
            return Err(WorkflowError::not_found("slot approval"));
        };
        if approval.is_resolved() {
            return Err(already_processed(&approval));
        }

        let notes = normalized_notes(notes);
        if decision == Decision::Reject && notes.is_none() {
            return Err(ValidationError::MissingDecisionNotes.into());
        }

        let slot = self
            .store
            .slot_by_id(&slot_id)
            .await?
            .ok_or(WorkflowError::not_found("slot"))?;
        let offer = self
            .store
            .offer_by_id(&approval.offer_id)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?;

        // A booking that already lost to a sibling must not consume the token.
        if decision == Decision::Approve {
            self.flow
                .slot_transition(slot.status, SlotEvent::BookingApproved)
                .map_err(|_| WorkflowError::SlotUnavailable)?;
        }

        let now = Utc::now();
        let resolved = self
            .approvals
            .resolve_approval(token, decision.resolved_status(), notes.as_deref(), now)
            .await?;
        if resolved == 0 {
            return Err(self.reread_resolved(token).await?);
        }

        let resolved_approval = resolved_copy(approval, decision, notes, now);

        match decision {
            Decision::Approve => {
                let guest = slot.guest.clone();
                let mut notifications = Vec::new();
                if let (Some(host_contact), Some(guest)) =
                    (offer.host_contact.as_deref(), guest.as_ref())
                {
                    notifications
                        .push(notify::booking_confirmed_host(&offer, &slot, guest, host_contact));
                }
                if let Some(guest) = guest.as_ref() {
                    notifications.push(notify::booking_confirmed_guest(&offer, &slot, guest));
                }

                let cascade = self
                    .store
                    .commit_booking(
                        &offer.id,
                        &slot_id,
                        &[SlotStatus::Held, SlotStatus::PendingApproval],
                        None,
                        &notifications,
                        now,
                    )
                    .await?
                    .ok_or(WorkflowError::SlotUnavailable)?;

                info!(
                    event_name = "booking.slot_booked",
                    offer_id = %offer.id.0,
                    slot_id = %slot_id.0,
                    rejected_siblings = cascade.rejected_siblings,
                    "slot booking approved"
                );

                Ok(SlotDecision { approval: resolved_approval, cascade: Some(cascade) })
            }
            Decision::Reject => {
                let released = self
                    .store
                    .release_slot(
                        &slot_id,
                        &[SlotStatus::Held, SlotStatus::PendingApproval],
                        now,
                    )
                    .await?;

                if released > 0 {
                    if let Some(host_contact) = offer.host_contact.as_deref() {
                        self.outbox
                            .enqueue(notify::booking_rejected_host(&offer, &slot, host_contact))
                            .await?;
                    }
                    if let Some(guest) = slot.guest.as_ref() {
                        self.outbox
                            .enqueue(notify::booking_rejected_guest(&offer, &slot, guest))
                            .await?;
                    }
                }

                info!(
                    event_name = "booking.slot_booking_rejected",
                    offer_id = %offer.id.0,
                    slot_id = %slot_id.0,
                    reopened = released > 0,
                    "slot booking rejected"
                );

                Ok(SlotDecision { approval: resolved_approval, cascade: None })
            }
        }
    }

    /// Applies the single-slot decision to every pending slot approval of
    /// the offer. Outcomes are reported per item; a failure mid-batch leaves
    /// earlier items committed.
    pub async fn bulk_decide_pending(
        &self,
        offer_id: &OfferId,
        decision: Decision,
        notes: Option<&str>,
    ) -> Result<BulkDecision, WorkflowError> {
        let offer = self
            .store
            .offer_by_id(offer_id)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?;

        let notes = normalized_notes(notes);
        if decision == Decision::Reject && notes.is_none() {
            return Err(ValidationError::MissingDecisionNotes.into());
        }

        let pending = self.approvals.pending_slot_approvals(offer_id).await?;
        let mut items = Vec::with_capacity(pending.len());

        for approval in pending {
            let outcome = self
                .decide_slot_approval(&approval.approval_token, decision, notes.as_deref())
                .await
                .map(|decided| decided.approval.status);
            items.push(BulkItem { approval, outcome });
        }

        if decision == Decision::Reject {
            let now = Utc::now();
            let slots = self.store.slots_for_offer(offer_id).await?;
            let any_booked = slots.iter().any(|slot| slot.status == SlotStatus::Booked);

            if !any_booked && offer.status == OfferStatus::Open {
                self.flow.offer_transition(offer.status, OfferEvent::SlotsExhausted)?;
                self.store.reject_claimable_slots(offer_id, None, now).await?;
                self.store
                    .update_offer_status(offer_id, &[OfferStatus::Open], OfferStatus::Cancelled, now)
                    .await?;

                if let Some(host_contact) = offer.host_contact.as_deref() {
                    self.outbox.enqueue(notify::offer_cancelled(&offer, host_contact)).await?;
                }

                info!(
                    event_name = "booking.offer_exhausted",
                    offer_id = %offer_id.0,
                    "all pending bookings rejected, offer cancelled"
                );
            }
        }

        let offer_status = self
            .store
            .offer_by_id(offer_id)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?
            .status;

        Ok(BulkDecision { items, offer_status })
    }

    /// Host cancels their own offer; remaining claimable slots are rejected.
    pub async fn cancel_offer(&self, offer_id: &OfferId) -> Result<MatchOffer, WorkflowError> {
        let offer = self
            .store
            .offer_by_id(offer_id)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?;

        let transition = self.flow.offer_transition(offer.status, OfferEvent::HostCancelled)?;

        let now = Utc::now();
        let affected = self
            .store
            .update_offer_status(offer_id, &[offer.status], transition.to, now)
            .await?;
        if affected == 0 {
            return Err(DomainError::InvalidOfferTransition {
                from: offer.status,
                to: transition.to,
            }
            .into());
        }
        self.store.reject_claimable_slots(offer_id, None, now).await?;

        info!(
            event_name = "booking.offer_cancelled",
            offer_id = %offer_id.0,
            "offer cancelled by host"
        );

        let mut updated = offer;
        updated.status = transition.to;
        updated.updated_at = now;
        Ok(updated)
    }

    /// Explicit host delete: hard removal with slot cascade.
    pub async fn delete_offer(&self, offer_id: &OfferId) -> Result<(), WorkflowError> {
        let deleted = self.store.delete_offer(offer_id).await?;
        if deleted == 0 {
            return Err(WorkflowError::not_found("offer"));
        }

        info!(event_name = "booking.offer_deleted", offer_id = %offer_id.0, "offer deleted");
        Ok(())
    }

    /// The explicit expiry sweep: reopens slots held longer than the policy
    /// timeout. Nothing reverts holds outside this operation.
    pub async fn release_stale_holds(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SlotId>, WorkflowError> {
        let cutoff = now - Duration::minutes(self.flow.policy().hold_timeout_minutes);
        let released = self.store.release_stale_holds(cutoff, now).await?;

        if !released.is_empty() {
            info!(
                event_name = "booking.stale_holds_released",
                released = released.len(),
                "stale holds swept back to open"
            );
        }

        Ok(released)
    }

    /// Records the final score on a booked slot after the match was played.
    pub async fn record_result(
        &self,
        slot_id: &SlotId,
        result: MatchResult,
        notes: Option<&str>,
    ) -> Result<Slot, WorkflowError> {
        let slot = self
            .store
            .slot_by_id(slot_id)
            .await?
            .ok_or(WorkflowError::not_found("slot"))?;
        if slot.status != SlotStatus::Booked {
            return Err(ValidationError::ResultRequiresBookedSlot.into());
        }

        let affected = self.store.record_result(slot_id, &result, notes, Utc::now()).await?;
        if affected == 0 {
            return Err(ValidationError::ResultRequiresBookedSlot.into());
        }

        self.store
            .slot_by_id(slot_id)
            .await?
            .ok_or(WorkflowError::not_found("slot"))
    }

    /// Guest-facing read behind the share link.
    pub async fn offer_view(&self, share_token: &str) -> Result<OfferWithSlots, WorkflowError> {
        let offer = self
            .store
            .offer_by_share_token(share_token)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?;
        let slots = self.store.slots_for_offer(&offer.id).await?;
        Ok(OfferWithSlots { offer, slots })
    }

    /// Approver-facing read behind the approval link; resolved approvals
    /// degrade to this read-only view.
    pub async fn approval_view(&self, token: &str) -> Result<ApprovalView, WorkflowError> {
        let approval = self
            .approvals
            .approval_by_token(token)
            .await?
            .ok_or(WorkflowError::not_found("approval"))?;
        let offer = self
            .store
            .offer_by_id(&approval.offer_id)
            .await?
            .ok_or(WorkflowError::not_found("offer"))?;
        let slots = self.store.slots_for_offer(&offer.id).await?;
        Ok(ApprovalView { approval, offer, slots })
    }

    /// Resolves the host's locally kept bookmark list of offer ids.
    pub async fn offers_for_host(
        &self,
        ids: &[OfferId],
    ) -> Result<Vec<OfferWithSlots>, WorkflowError> {
        let offers = self.store.offers_by_ids(ids).await?;
        let mut result = Vec::with_capacity(offers.len());
        for offer in offers {
            let slots = self.store.slots_for_offer(&offer.id).await?;
            result.push(OfferWithSlots { offer, slots });
        }
        Ok(result)
    }

    async fn issue_share_token(&self) -> Result<String, WorkflowError> {
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let candidate = self.tokens.issue();
            if self.store.offer_by_share_token(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(WorkflowError::Persistence(StoreError::Backend(
            "share token collided on every attempt".to_string(),
        )))
    }

    async fn issue_approval_token(&self) -> Result<String, WorkflowError> {
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let candidate = self.tokens.issue();
            if self.approvals.approval_by_token(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(WorkflowError::Persistence(StoreError::Backend(
            "approval token collided on every attempt".to_string(),
        )))
    }

    /// After losing the resolve race, report the stored decision.
    async fn reread_resolved(&self, token: &str) -> Result<WorkflowError, WorkflowError> {
        let fresh = self
            .approvals
            .approval_by_token(token)
            .await?
            .ok_or(WorkflowError::not_found("approval"))?;
        Ok(already_processed(&fresh))
    }
}

fn already_processed(approval: &Approval) -> WorkflowError {
    WorkflowError::AlreadyProcessed {
        decision: approval.status,
        decided_at: approval.decision_at,
        notes: approval.decision_notes.clone(),
    }
}

fn normalized_notes(notes: Option<&str>) -> Option<String> {
    notes.map(str::trim).filter(|notes| !notes.is_empty()).map(str::to_string)
}

fn resolved_copy(
    mut approval: Approval,
    decision: Decision,
    notes: Option<String>,
    at: DateTime<Utc>,
) -> Approval {
    approval.status = decision.resolved_status();
    approval.decision_at = Some(at);
    approval.decision_notes = notes;
    approval
}

fn validate_draft(draft: &OfferDraft) -> Result<(), ValidationError> {
    if draft.host_name.trim().is_empty() {
        return Err(ValidationError::MissingField("host_name"));
    }
    if draft.location.trim().is_empty() {
        return Err(ValidationError::MissingField("location"));
    }
    validate_email(&draft.approver_email)?;
    if let Some(contact) = draft.host_contact.as_deref() {
        validate_email(contact)?;
    }
    if !MATCH_DURATIONS_MINUTES.contains(&draft.duration_minutes) {
        return Err(ValidationError::UnsupportedDuration(draft.duration_minutes));
    }
    if draft.slots.is_empty() {
        return Err(ValidationError::NoSlots);
    }
    for slot in &draft.slots {
        validate_window(slot.start_time, slot.end_time, draft.duration_minutes)?;
    }
    Ok(())
}

fn validate_email(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    let mut parts = trimmed.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();

    let valid = !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !trimmed.contains(char::is_whitespace);
    if !valid {
        return Err(ValidationError::InvalidEmail(value.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, Utc};

    use super::{
        BookingOutcome, OfferDraft, SlotDraft, WorkflowCoordinator,
    };
    use crate::domain::approval::{ApprovalStatus, Decision};
    use crate::domain::notification::{NotificationKind, RecipientRole};
    use crate::domain::offer::{AgeGroup, MatchFormat, OfferId, OfferStatus};
    use crate::domain::slot::{GuestDetails, MatchResult, SlotStatus};
    use crate::errors::{ValidationError, WorkflowError};
    use crate::flows::{ApprovalMode, WorkflowPolicy};
    use crate::links::LinkBuilder;
    use crate::store::{BookingStore, InMemoryStore, NotificationOutbox};
    use crate::token::{RandomTokenIssuer, TokenIssuer};

    /// Replays scripted tokens before falling back to random ones; used to
    /// force collisions.
    struct ScriptedTokenIssuer {
        scripted: Mutex<Vec<String>>,
    }

    impl ScriptedTokenIssuer {
        fn new(scripted: Vec<&str>) -> Self {
            Self { scripted: Mutex::new(scripted.into_iter().map(str::to_string).collect()) }
        }
    }

    impl TokenIssuer for ScriptedTokenIssuer {
        fn issue(&self) -> String {
            let mut scripted = match self.scripted.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if scripted.is_empty() {
                RandomTokenIssuer.issue()
            } else {
                scripted.remove(0)
            }
        }
    }

    fn coordinator_with(
        policy: WorkflowPolicy,
        tokens: Arc<dyn TokenIssuer>,
    ) -> (WorkflowCoordinator, InMemoryStore) {
        let store = InMemoryStore::new();
        let coordinator = WorkflowCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            tokens,
            LinkBuilder::new("https://matchslot.app"),
            policy,
        );
        (coordinator, store)
    }

    fn coordinator(policy: WorkflowPolicy) -> (WorkflowCoordinator, InMemoryStore) {
        coordinator_with(policy, Arc::new(RandomTokenIssuer))
    }

    fn offer_first_policy() -> WorkflowPolicy {
        WorkflowPolicy::default()
    }

    fn slot_only_policy() -> WorkflowPolicy {
        WorkflowPolicy { approval_mode: ApprovalMode::SlotOnly, ..WorkflowPolicy::default() }
    }

    fn direct_booking_policy() -> WorkflowPolicy {
        WorkflowPolicy {
            approval_mode: ApprovalMode::SlotOnly,
            require_slot_approval: false,
            ..WorkflowPolicy::default()
        }
    }

    /// Three slots at 10:00, 11:00, and 12:00 tomorrow.
    fn draft() -> OfferDraft {
        let base = (Utc::now() + Duration::days(1))
            .date_naive()
            .and_hms_opt(10, 0, 0)
            .expect("valid time")
            .and_utc();

        OfferDraft {
            host_name: "Sam Porter".to_string(),
            host_club: Some("Riverside FC".to_string()),
            host_contact: Some("sam@riverside.example".to_string()),
            age_group: AgeGroup::U12,
            format: MatchFormat::ElevenASide,
            duration_minutes: 90,
            location: "Riverside Park, Pitch 2".to_string(),
            notes: None,
            approver_email: "approver@club.example".to_string(),
            slots: (0..3)
                .map(|hour| SlotDraft {
                    start_time: base + Duration::hours(hour),
                    end_time: base + Duration::hours(hour) + Duration::minutes(90),
                })
                .collect(),
        }
    }

    fn guest() -> GuestDetails {
        GuestDetails {
            name: "Alex Reid".to_string(),
            club: "Visitors United".to_string(),
            contact: "alex@visitors.example".to_string(),
            notes: None,
        }
    }

    async fn assert_single_booked_invariant(store: &InMemoryStore, offer_id: &OfferId) {
        let slots = store.slots_for_offer(offer_id).await.expect("slots");
        let booked = slots.iter().filter(|slot| slot.status == SlotStatus::Booked).count();
        assert!(booked <= 1, "at most one slot may be booked, found {booked}");
        if booked == 1 {
            assert!(
                slots
                    .iter()
                    .all(|slot| slot.status == SlotStatus::Booked
                        || slot.status == SlotStatus::Rejected),
                "every sibling of a booked slot must be rejected"
            );
            let offer =
                store.offer_by_id(offer_id).await.expect("offer").expect("offer exists");
            assert_eq!(offer.status, OfferStatus::Closed);
        }
    }

    #[tokio::test]
    async fn offer_first_creation_requests_approval() {
        let (coordinator, store) = coordinator(offer_first_policy());

        let created = coordinator.create_offer(draft()).await.expect("create");
        assert_eq!(created.offer.status, OfferStatus::PendingApproval);
        assert!(created.approval_link.is_some());
        assert!(created.share_link.contains(&created.offer.share_token));
        assert!(created.slots.iter().all(|slot| slot.status == SlotStatus::Open));

        let notifications = store.for_offer(&created.offer.id).await.expect("outbox");
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::OfferApprovalRequest);
        assert_eq!(notifications[0].recipient_role, RecipientRole::Approver);
        assert_eq!(notifications[0].recipient_email, "approver@club.example");
    }

    #[tokio::test]
    async fn slot_only_offers_are_shareable_immediately() {
        let (coordinator, store) = coordinator(slot_only_policy());

        let created = coordinator.create_offer(draft()).await.expect("create");
        assert_eq!(created.offer.status, OfferStatus::Open);
        assert!(created.approval_link.is_none());

        let notifications = store.for_offer(&created.offer.id).await.expect("outbox");
        assert!(notifications.is_empty());
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected_before_any_write() {
        let (coordinator, store) = coordinator(offer_first_policy());

        let mut missing_host = draft();
        missing_host.host_name = "  ".to_string();
        let error = coordinator.create_offer(missing_host).await.expect_err("must fail");
        assert_eq!(
            error,
            WorkflowError::Validation(ValidationError::MissingField("host_name"))
        );

        let mut bad_email = draft();
        bad_email.approver_email = "not-an-email".to_string();
        assert!(matches!(
            coordinator.create_offer(bad_email).await.expect_err("must fail"),
            WorkflowError::Validation(ValidationError::InvalidEmail(_))
        ));

        let mut bad_window = draft();
        bad_window.slots[0].end_time = bad_window.slots[0].start_time;
        assert!(matches!(
            coordinator.create_offer(bad_window).await.expect_err("must fail"),
            WorkflowError::Validation(ValidationError::EmptyWindow)
        ));

        assert!(store.offers_by_ids(&[]).await.expect("query").is_empty());
    }

    #[tokio::test]
    async fn request_offer_approval_is_idempotent_per_offer() {
        let (coordinator, store) = coordinator(offer_first_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");

        let again =
            coordinator.request_offer_approval(&created.offer.id).await.expect("request again");
        let link = created.approval_link.expect("approval link");
        assert_eq!(again.approval_link, link);

        // Still exactly one approval request in the outbox.
        let notifications = store.for_offer(&created.offer.id).await.expect("outbox");
        let requests = notifications
            .iter()
            .filter(|n| n.kind == NotificationKind::OfferApprovalRequest)
            .count();
        assert_eq!(requests, 1);
    }

    #[tokio::test]
    async fn approving_an_offer_opens_it_and_notifies_the_host() {
        let (coordinator, store) = coordinator(offer_first_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let token = created.approval_link.expect("link");
        let token = token.rsplit('/').next().expect("token segment");

        let decided = coordinator
            .decide_offer_approval(token, Decision::Approve, None)
            .await
            .expect("approve");
        assert_eq!(decided.offer.status, OfferStatus::Open);
        assert_eq!(decided.approval.status, ApprovalStatus::Approved);

        let notifications = store.for_offer(&created.offer.id).await.expect("outbox");
        let host_notice = notifications
            .iter()
            .find(|n| n.recipient_role == RecipientRole::Host)
            .expect("host notified");
        assert_eq!(host_notice.kind, NotificationKind::Approved);
        assert!(host_notice.body.contains(&created.offer.share_token));
    }

    #[tokio::test]
    async fn rejecting_an_offer_requires_notes() {
        let (coordinator, store) = coordinator(offer_first_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let link = created.approval_link.expect("link");
        let token = link.rsplit('/').next().expect("token segment");

        let error = coordinator
            .decide_offer_approval(token, Decision::Reject, Some("   "))
            .await
            .expect_err("reject without notes");
        assert_eq!(
            error,
            WorkflowError::Validation(ValidationError::MissingDecisionNotes)
        );

        // No state mutation happened.
        let offer = store
            .offer_by_id(&created.offer.id)
            .await
            .expect("read")
            .expect("offer exists");
        assert_eq!(offer.status, OfferStatus::PendingApproval);
        let view = coordinator.approval_view(token).await.expect("view");
        assert_eq!(view.approval.status, ApprovalStatus::Pending);
    }

    #[tokio::test]
    async fn rejecting_an_offer_cancels_it_with_stored_reason() {
        let (coordinator, store) = coordinator(offer_first_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let link = created.approval_link.expect("link");
        let token = link.rsplit('/').next().expect("token segment");

        let decided = coordinator
            .decide_offer_approval(token, Decision::Reject, Some("insufficient info"))
            .await
            .expect("reject");
        assert_eq!(decided.offer.status, OfferStatus::Cancelled);
        assert_eq!(decided.approval.status, ApprovalStatus::Rejected);
        assert_eq!(decided.approval.decision_notes.as_deref(), Some("insufficient info"));

        let notifications = store.for_offer(&created.offer.id).await.expect("outbox");
        let host_notice = notifications
            .iter()
            .find(|n| n.recipient_role == RecipientRole::Host)
            .expect("host notified");
        assert_eq!(host_notice.kind, NotificationKind::Rejected);
        assert!(host_notice.body.contains("insufficient info"));
    }

    #[tokio::test]
    async fn resolved_tokens_are_single_use() {
        let (coordinator, _store) = coordinator(offer_first_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let link = created.approval_link.expect("link");
        let token = link.rsplit('/').next().expect("token segment");

        coordinator
            .decide_offer_approval(token, Decision::Approve, None)
            .await
            .expect("first decision");

        let error = coordinator
            .decide_offer_approval(token, Decision::Reject, Some("changed my mind"))
            .await
            .expect_err("second decision");
        assert!(matches!(
            error,
            WorkflowError::AlreadyProcessed { decision: ApprovalStatus::Approved, .. }
        ));

        // The offer kept the first decision's outcome.
        let view = coordinator.approval_view(token).await.expect("view");
        assert_eq!(view.offer.status, OfferStatus::Open);
        assert_eq!(view.approval.status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn approved_booking_cascades_to_siblings_and_offer() {
        let (coordinator, store) = coordinator(offer_first_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let offer_link = created.approval_link.expect("link");
        let offer_token = offer_link.rsplit('/').next().expect("token segment");
        coordinator
            .decide_offer_approval(offer_token, Decision::Approve, None)
            .await
            .expect("open the offer");

        // Guest picks the 11:00 slot.
        let eleven = &created.slots[1];
        coordinator.claim_slot(&eleven.id, "session-a").await.expect("claim");
        let outcome = coordinator
            .request_slot_booking(&eleven.id, guest(), "session-a")
            .await
            .expect("request booking");
        let BookingOutcome::PendingApproval { approval, .. } = outcome else {
            panic!("approval-gated policy must not book directly");
        };

        let decided = coordinator
            .decide_slot_approval(&approval.approval_token, Decision::Approve, None)
            .await
            .expect("approve booking");
        let cascade = decided.cascade.expect("cascade");
        assert_eq!(cascade.slot.id, eleven.id);
        assert_eq!(cascade.slot.status, SlotStatus::Booked);
        assert_eq!(cascade.offer.status, OfferStatus::Closed);
        assert_eq!(cascade.rejected_siblings, 2);

        let slots = store.slots_for_offer(&created.offer.id).await.expect("slots");
        for slot in &slots {
            if slot.id == eleven.id {
                assert_eq!(slot.status, SlotStatus::Booked);
            } else {
                assert_eq!(slot.status, SlotStatus::Rejected);
            }
        }
        assert_single_booked_invariant(&store, &created.offer.id).await;

        // Booking enqueued exactly two confirmations: host and guest.
        let notifications = store.for_offer(&created.offer.id).await.expect("outbox");
        let confirmations: Vec<_> = notifications
            .iter()
            .filter(|n| n.kind == NotificationKind::Approved && n.slot_id.is_some())
            .collect();
        assert_eq!(confirmations.len(), 2);
        assert!(confirmations.iter().any(|n| n.recipient_role == RecipientRole::Host));
        assert!(confirmations.iter().any(|n| n.recipient_role == RecipientRole::Guest));
    }

    #[tokio::test]
    async fn direct_booking_policy_books_without_an_approver() {
        let (coordinator, store) = coordinator(direct_booking_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");

        let ten = &created.slots[0];
        let outcome = coordinator
            .request_slot_booking(&ten.id, guest(), "session-a")
            .await
            .expect("book directly");
        let BookingOutcome::Booked(cascade) = outcome else {
            panic!("direct policy must book on request");
        };
        assert_eq!(cascade.slot.status, SlotStatus::Booked);
        assert_eq!(cascade.slot.guest.as_ref().map(|g| g.club.as_str()), Some("Visitors United"));
        assert_single_booked_invariant(&store, &created.offer.id).await;
    }

    #[tokio::test]
    async fn concurrent_claims_have_exactly_one_winner() {
        let (coordinator, store) = coordinator(slot_only_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let slot_id = created.slots[0].id.clone();

        let (first, second) = tokio::join!(
            coordinator.claim_slot(&slot_id, "session-a"),
            coordinator.claim_slot(&slot_id, "session-b"),
        );

        let successes = [&first, &second].iter().filter(|result| result.is_ok()).count();
        assert_eq!(successes, 1, "exactly one claim may win");
        let winner_session = if first.is_ok() { "session-a" } else { "session-b" };
        let loser = if first.is_ok() { second } else { first };
        assert_eq!(loser.expect_err("loser fails"), WorkflowError::SlotUnavailable);

        // The stored hold reflects the winner's session only.
        let slot = store.slot_by_id(&slot_id).await.expect("read").expect("exists");
        assert_eq!(slot.status, SlotStatus::Held);
        assert_eq!(slot.held_by_session.as_deref(), Some(winner_session));
    }

    #[tokio::test]
    async fn booking_a_taken_slot_reports_unavailable() {
        let (coordinator, _store) = coordinator(slot_only_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let slot_id = created.slots[0].id.clone();

        coordinator.claim_slot(&slot_id, "session-a").await.expect("claim");

        let error = coordinator
            .request_slot_booking(&slot_id, guest(), "session-b")
            .await
            .expect_err("slot is held by someone else");
        assert_eq!(error, WorkflowError::SlotUnavailable);

        let error =
            coordinator.claim_slot(&slot_id, "session-b").await.expect_err("already held");
        assert_eq!(error, WorkflowError::SlotUnavailable);
    }

    #[tokio::test]
    async fn a_claimed_slot_can_be_booked_by_its_holder() {
        let (coordinator, _store) = coordinator(slot_only_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let slot_id = created.slots[0].id.clone();

        coordinator.claim_slot(&slot_id, "session-a").await.expect("claim");
        let outcome = coordinator
            .request_slot_booking(&slot_id, guest(), "session-a")
            .await
            .expect("holder books");
        assert!(matches!(outcome, BookingOutcome::PendingApproval { .. }));
    }

    #[tokio::test]
    async fn rejecting_a_booking_reopens_the_slot() {
        let (coordinator, store) = coordinator(slot_only_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let slot_id = created.slots[0].id.clone();

        let outcome = coordinator
            .request_slot_booking(&slot_id, guest(), "session-a")
            .await
            .expect("request");
        let BookingOutcome::PendingApproval { approval, .. } = outcome else {
            panic!("expected pending approval");
        };

        let decided = coordinator
            .decide_slot_approval(&approval.approval_token, Decision::Reject, Some("double booked"))
            .await
            .expect("reject");
        assert!(decided.cascade.is_none());

        let slot = store.slot_by_id(&slot_id).await.expect("read").expect("exists");
        assert_eq!(slot.status, SlotStatus::Open);
        assert!(slot.guest.is_none(), "guest fields are cleared on rejection");
        assert!(slot.held_by_session.is_none());

        let notifications = store.for_offer(&created.offer.id).await.expect("outbox");
        let rejections =
            notifications.iter().filter(|n| n.kind == NotificationKind::Rejected).count();
        assert_eq!(rejections, 2, "host and guest are both told");
    }

    #[tokio::test]
    async fn bulk_reject_cancels_an_offer_with_no_booking() {
        let (coordinator, store) = coordinator(slot_only_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");

        for (index, slot) in created.slots.iter().take(2).enumerate() {
            let session = format!("session-{index}");
            coordinator
                .request_slot_booking(&slot.id, guest(), &session)
                .await
                .expect("request");
        }

        let bulk = coordinator
            .bulk_decide_pending(&created.offer.id, Decision::Reject, Some("pitch closed"))
            .await
            .expect("bulk reject");
        assert_eq!(bulk.items.len(), 2);
        assert!(bulk.items.iter().all(|item| item.outcome == Ok(ApprovalStatus::Rejected)));
        assert_eq!(bulk.offer_status, OfferStatus::Cancelled);

        let slots = store.slots_for_offer(&created.offer.id).await.expect("slots");
        assert!(slots.iter().all(|slot| slot.status == SlotStatus::Rejected));
    }

    #[tokio::test]
    async fn bulk_approve_books_the_first_and_reports_the_rest() {
        let (coordinator, store) = coordinator(slot_only_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");

        for (index, slot) in created.slots.iter().take(2).enumerate() {
            let session = format!("session-{index}");
            coordinator
                .request_slot_booking(&slot.id, guest(), &session)
                .await
                .expect("request");
        }

        let bulk = coordinator
            .bulk_decide_pending(&created.offer.id, Decision::Approve, None)
            .await
            .expect("bulk approve");
        assert_eq!(bulk.items.len(), 2);
        assert_eq!(bulk.offer_status, OfferStatus::Closed);

        let won = bulk.items.iter().filter(|item| item.outcome.is_ok()).count();
        assert_eq!(won, 1, "only one booking can win");
        let lost = bulk
            .items
            .iter()
            .filter(|item| item.outcome == Err(WorkflowError::SlotUnavailable))
            .count();
        assert_eq!(lost, 1, "the loser is reported, not rolled back");

        assert_single_booked_invariant(&store, &created.offer.id).await;
    }

    #[tokio::test]
    async fn stale_holds_are_swept_back_to_open() {
        let (coordinator, store) = coordinator(slot_only_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let slot_id = created.slots[0].id.clone();

        coordinator.claim_slot(&slot_id, "session-a").await.expect("claim");

        // Nothing stale yet.
        let released = coordinator.release_stale_holds(Utc::now()).await.expect("sweep");
        assert!(released.is_empty());

        // Well past the policy timeout.
        let later = Utc::now() + Duration::minutes(16);
        let released = coordinator.release_stale_holds(later).await.expect("sweep");
        assert_eq!(released, vec![slot_id.clone()]);

        let slot = store.slot_by_id(&slot_id).await.expect("read").expect("exists");
        assert_eq!(slot.status, SlotStatus::Open);
        assert!(slot.held_by_session.is_none());
    }

    #[tokio::test]
    async fn colliding_share_tokens_are_retried() {
        // The scripted issuer repeats "dup" so the first offer takes it and
        // the second offer must retry past the collision.
        let issuer = Arc::new(ScriptedTokenIssuer::new(vec!["dup", "dup", "tok-b"]));
        let (coordinator, _store) = coordinator_with(slot_only_policy(), issuer);

        let first = coordinator.create_offer(draft()).await.expect("first offer");
        assert_eq!(first.offer.share_token, "dup");

        let second = coordinator.create_offer(draft()).await.expect("second offer");
        assert_eq!(second.offer.share_token, "tok-b");
    }

    #[tokio::test]
    async fn results_are_recorded_only_on_booked_slots() {
        let (coordinator, _store) = coordinator(direct_booking_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");
        let open_slot = created.slots[1].id.clone();

        let error = coordinator
            .record_result(&open_slot, MatchResult { home_score: 2, away_score: 1 }, None)
            .await
            .expect_err("open slot takes no result");
        assert_eq!(
            error,
            WorkflowError::Validation(ValidationError::ResultRequiresBookedSlot)
        );

        let booked = coordinator
            .request_slot_booking(&created.slots[0].id, guest(), "session-a")
            .await
            .expect("book");
        let BookingOutcome::Booked(cascade) = booked else {
            panic!("direct policy books immediately");
        };

        let updated = coordinator
            .record_result(
                &cascade.slot.id,
                MatchResult { home_score: 2, away_score: 1 },
                Some("close game"),
            )
            .await
            .expect("record result");
        let result = updated.result.expect("stored result");
        assert_eq!((result.home_score, result.away_score), (2, 1));
        assert_eq!(result.notes.as_deref(), Some("close game"));
    }

    #[tokio::test]
    async fn cancel_offer_rejects_remaining_slots() {
        let (coordinator, store) = coordinator(slot_only_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");

        let cancelled = coordinator.cancel_offer(&created.offer.id).await.expect("cancel");
        assert_eq!(cancelled.status, OfferStatus::Cancelled);

        let slots = store.slots_for_offer(&created.offer.id).await.expect("slots");
        assert!(slots.iter().all(|slot| slot.status == SlotStatus::Rejected));

        // Terminal: cancelling again is a domain error.
        assert!(matches!(
            coordinator.cancel_offer(&created.offer.id).await.expect_err("already cancelled"),
            WorkflowError::Domain(_)
        ));
    }

    #[tokio::test]
    async fn deleted_offers_vanish_from_the_share_link() {
        let (coordinator, _store) = coordinator(slot_only_policy());
        let created = coordinator.create_offer(draft()).await.expect("create");

        coordinator.delete_offer(&created.offer.id).await.expect("delete");
        let error = coordinator
            .offer_view(&created.offer.share_token)
            .await
            .expect_err("share link dead");
        assert_eq!(error, WorkflowError::NotFound { entity: "offer" });

        let error =
            coordinator.delete_offer(&created.offer.id).await.expect_err("double delete");
        assert_eq!(error, WorkflowError::NotFound { entity: "offer" });
    }

    #[tokio::test]
    async fn unknown_tokens_report_not_found() {
        let (coordinator, _store) = coordinator(offer_first_policy());

        assert_eq!(
            coordinator.offer_view("missing").await.expect_err("no offer"),
            WorkflowError::NotFound { entity: "offer" }
        );
        assert_eq!(
            coordinator
                .decide_approval("missing", Decision::Approve, None)
                .await
                .expect_err("no approval"),
            WorkflowError::NotFound { entity: "approval" }
        );
    }
}
