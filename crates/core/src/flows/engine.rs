use thiserror::Error;

use crate::domain::offer::OfferStatus;
use crate::domain::slot::SlotStatus;
use crate::flows::states::{
    ApprovalMode, FlowAction, OfferEvent, OfferTransition, SlotEvent, SlotTransition,
    WorkflowPolicy,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("offer in {status:?} cannot take event {event:?}")]
    InvalidOfferEvent { status: OfferStatus, event: OfferEvent },
    #[error("slot in {status:?} cannot take event {event:?}")]
    InvalidSlotEvent { status: SlotStatus, event: SlotEvent },
}

/// The sole authority over offer and slot status transitions. Pure: an event
/// applied to a current status yields the next status plus the side effects
/// the caller must perform, or a typed rejection.
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingFlow {
    policy: WorkflowPolicy,
}

impl BookingFlow {
    pub fn new(policy: WorkflowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    /// Initial status of a freshly created offer under this policy.
    pub fn initial_offer_status(&self) -> OfferStatus {
        match self.policy.approval_mode {
            ApprovalMode::OfferFirst => OfferStatus::PendingApproval,
            ApprovalMode::SlotOnly => OfferStatus::Open,
        }
    }

    pub fn offer_transition(
        &self,
        current: OfferStatus,
        event: OfferEvent,
    ) -> Result<OfferTransition, FlowTransitionError> {
        use FlowAction::{NotifyHost, RejectSiblings};
        use OfferEvent::{
            ApprovalDenied, ApprovalGranted, HostCancelled, SlotBooked, SlotsExhausted,
        };
        use OfferStatus::{Cancelled, Closed, Open, PendingApproval};

        let (to, actions) = match (current, event) {
            (PendingApproval, ApprovalGranted) => (Open, vec![NotifyHost]),
            (PendingApproval, ApprovalDenied) => (Cancelled, vec![NotifyHost]),
            (Open, SlotBooked) => (Closed, Vec::new()),
            (Open, HostCancelled) | (PendingApproval, HostCancelled) => {
                (Cancelled, vec![RejectSiblings])
            }
            (Open, SlotsExhausted) => (Cancelled, vec![NotifyHost]),
            _ => return Err(FlowTransitionError::InvalidOfferEvent { status: current, event }),
        };

        Ok(OfferTransition { from: current, to, event, actions })
    }

    pub fn slot_transition(
        &self,
        current: SlotStatus,
        event: SlotEvent,
    ) -> Result<SlotTransition, FlowTransitionError> {
        use FlowAction::{
            AttachGuestDetails, ClearGuestDetails, CloseOffer, NotifyApprover, NotifyGuest,
            NotifyHost, RecordHold, RejectSiblings, RequestSlotApproval,
        };
        use SlotEvent::{
            BookingApproved, BookingDenied, BookingRequested, BulkRejected, GuestClaimed,
            HoldExpired, SiblingBooked,
        };
        use SlotStatus::{Booked, Held, Open, PendingApproval, Rejected};

        let (to, actions) = match (current, event) {
            (Open, GuestClaimed) => (Held, vec![RecordHold]),
            (Open, BookingRequested) | (Held, BookingRequested) => {
                if self.policy.require_slot_approval {
                    (
                        PendingApproval,
                        vec![AttachGuestDetails, RequestSlotApproval, NotifyApprover, NotifyHost],
                    )
                } else {
                    (
                        Booked,
                        vec![AttachGuestDetails, RejectSiblings, CloseOffer, NotifyHost, NotifyGuest],
                    )
                }
            }
            (Held, BookingApproved) | (PendingApproval, BookingApproved) => {
                (Booked, vec![RejectSiblings, CloseOffer, NotifyHost, NotifyGuest])
            }
            (Held, BookingDenied) | (PendingApproval, BookingDenied) => {
                (Open, vec![ClearGuestDetails, NotifyHost, NotifyGuest])
            }
            (Open, SiblingBooked) | (Held, SiblingBooked) | (PendingApproval, SiblingBooked) => {
                (Rejected, Vec::new())
            }
            (Open, BulkRejected) | (Held, BulkRejected) | (PendingApproval, BulkRejected) => {
                (Rejected, vec![NotifyHost])
            }
            (Held, HoldExpired) => (Open, vec![ClearGuestDetails]),
            _ => return Err(FlowTransitionError::InvalidSlotEvent { status: current, event }),
        };

        Ok(SlotTransition { from: current, to, event, actions })
    }
}

#[cfg(test)]
mod tests {
    use super::{BookingFlow, FlowTransitionError};
    use crate::domain::offer::OfferStatus;
    use crate::domain::slot::SlotStatus;
    use crate::flows::states::{
        ApprovalMode, FlowAction, OfferEvent, SlotEvent, WorkflowPolicy,
    };

    fn flow(require_slot_approval: bool) -> BookingFlow {
        BookingFlow::new(WorkflowPolicy { require_slot_approval, ..WorkflowPolicy::default() })
    }

    #[test]
    fn offer_first_mode_creates_offers_pending_approval() {
        assert_eq!(flow(true).initial_offer_status(), OfferStatus::PendingApproval);

        let slot_only = BookingFlow::new(WorkflowPolicy {
            approval_mode: ApprovalMode::SlotOnly,
            ..WorkflowPolicy::default()
        });
        assert_eq!(slot_only.initial_offer_status(), OfferStatus::Open);
    }

    #[test]
    fn approval_decision_routes_a_pending_offer() {
        let flow = flow(true);

        let granted = flow
            .offer_transition(OfferStatus::PendingApproval, OfferEvent::ApprovalGranted)
            .expect("pending -> open");
        assert_eq!(granted.to, OfferStatus::Open);

        let denied = flow
            .offer_transition(OfferStatus::PendingApproval, OfferEvent::ApprovalDenied)
            .expect("pending -> cancelled");
        assert_eq!(denied.to, OfferStatus::Cancelled);
    }

    #[test]
    fn booking_requires_an_open_offer() {
        let error = flow(true)
            .offer_transition(OfferStatus::Cancelled, OfferEvent::SlotBooked)
            .expect_err("cancelled offers take no bookings");
        assert!(matches!(error, FlowTransitionError::InvalidOfferEvent { .. }));
    }

    #[test]
    fn booking_request_routes_by_policy() {
        let gated = flow(true)
            .slot_transition(SlotStatus::Open, SlotEvent::BookingRequested)
            .expect("open -> pending approval");
        assert_eq!(gated.to, SlotStatus::PendingApproval);
        assert!(gated.actions.contains(&FlowAction::RequestSlotApproval));

        let direct = flow(false)
            .slot_transition(SlotStatus::Open, SlotEvent::BookingRequested)
            .expect("open -> booked");
        assert_eq!(direct.to, SlotStatus::Booked);
        assert!(direct.actions.contains(&FlowAction::RejectSiblings));
        assert!(direct.actions.contains(&FlowAction::CloseOffer));
    }

    #[test]
    fn approved_booking_triggers_the_full_cascade() {
        let outcome = flow(true)
            .slot_transition(SlotStatus::PendingApproval, SlotEvent::BookingApproved)
            .expect("pending -> booked");
        assert_eq!(outcome.to, SlotStatus::Booked);
        assert_eq!(
            outcome.actions,
            vec![
                FlowAction::RejectSiblings,
                FlowAction::CloseOffer,
                FlowAction::NotifyHost,
                FlowAction::NotifyGuest,
            ]
        );
    }

    #[test]
    fn denied_booking_reopens_and_clears_the_slot() {
        let outcome = flow(true)
            .slot_transition(SlotStatus::Held, SlotEvent::BookingDenied)
            .expect("held -> open");
        assert_eq!(outcome.to, SlotStatus::Open);
        assert!(outcome.actions.contains(&FlowAction::ClearGuestDetails));
    }

    #[test]
    fn terminal_slots_reject_every_event() {
        let flow = flow(true);
        for status in [SlotStatus::Booked, SlotStatus::Rejected] {
            for event in [
                SlotEvent::GuestClaimed,
                SlotEvent::BookingRequested,
                SlotEvent::BookingApproved,
                SlotEvent::SiblingBooked,
                SlotEvent::HoldExpired,
            ] {
                assert!(
                    flow.slot_transition(status, event).is_err(),
                    "{status:?} + {event:?} must be rejected"
                );
            }
        }
    }

    #[test]
    fn only_held_slots_expire() {
        let flow = flow(true);
        let released = flow
            .slot_transition(SlotStatus::Held, SlotEvent::HoldExpired)
            .expect("held -> open");
        assert_eq!(released.to, SlotStatus::Open);

        assert!(flow.slot_transition(SlotStatus::PendingApproval, SlotEvent::HoldExpired).is_err());
        assert!(flow.slot_transition(SlotStatus::Open, SlotEvent::HoldExpired).is_err());
    }

    #[test]
    fn replay_is_deterministic_for_the_same_event_sequence() {
        let flow = flow(true);
        let run = || {
            let mut status = SlotStatus::Open;
            let mut actions = Vec::new();
            for event in [SlotEvent::GuestClaimed, SlotEvent::BookingRequested, SlotEvent::BookingApproved] {
                let outcome = flow.slot_transition(status, event).expect("valid sequence");
                actions.push(outcome.actions.clone());
                status = outcome.to;
            }
            (status, actions)
        };

        assert_eq!(run(), run());
    }
}
