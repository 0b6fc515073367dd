use serde::{Deserialize, Serialize};

use crate::domain::offer::OfferStatus;
use crate::domain::slot::SlotStatus;

/// Which stage of the lifecycle requires human sign-off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// The offer needs approver sign-off before its share link is usable.
    OfferFirst,
    /// The offer is shareable immediately; only bookings are gated.
    SlotOnly,
}

/// Workflow variants observed in production, unified as configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    pub approval_mode: ApprovalMode,
    /// Whether a guest booking request needs approver sign-off or books
    /// the slot directly.
    pub require_slot_approval: bool,
    /// How long a slot may sit HELD before the expiry sweep reopens it.
    pub hold_timeout_minutes: i64,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            approval_mode: ApprovalMode::OfferFirst,
            require_slot_approval: true,
            hold_timeout_minutes: 15,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferEvent {
    ApprovalGranted,
    ApprovalDenied,
    SlotBooked,
    HostCancelled,
    SlotsExhausted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotEvent {
    GuestClaimed,
    BookingRequested,
    BookingApproved,
    BookingDenied,
    SiblingBooked,
    BulkRejected,
    HoldExpired,
}

/// Side effects a transition obliges the caller to perform. The machine
/// decides; the coordinator executes against the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    RecordHold,
    AttachGuestDetails,
    ClearGuestDetails,
    RequestSlotApproval,
    RejectSiblings,
    CloseOffer,
    NotifyHost,
    NotifyGuest,
    NotifyApprover,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferTransition {
    pub from: OfferStatus,
    pub to: OfferStatus,
    pub event: OfferEvent,
    pub actions: Vec<FlowAction>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTransition {
    pub from: SlotStatus,
    pub to: SlotStatus,
    pub event: SlotEvent,
    pub actions: Vec<FlowAction>,
}
